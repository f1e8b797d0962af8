//! RC → Widget geometry-rewrite benchmark: the one hot loop in this engine
//! worth tracking (`adjust_hierarchy`'s O(n^2) containment scan over a large
//! dialog's control list).

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use knut_rc::{convert_dialog, ConversionFlag, Control, Dialog, Geometry, Scale};

fn large_dialog(n: usize) -> Dialog {
    let controls = (0..n)
        .map(|i| Control {
            control_type: "LTEXT".to_string(),
            text: format!("Label {i}"),
            id: format!("IDC_LABEL{i}"),
            geometry: Geometry { x: (i as i32 % 20) * 40, y: (i as i32 / 20) * 20, w: 36, h: 14 },
            ..Default::default()
        })
        .collect();
    Dialog { id: "IDD_LARGE".to_string(), geometry: Geometry { x: 0, y: 0, w: 800, h: 600 }, controls, ..Default::default() }
}

fn bench_convert_dialog(c: &mut Criterion) {
    let dialog = large_dialog(400);
    c.bench_function("convert_dialog_400_controls", |b| {
        b.iter(|| convert_dialog(black_box(&dialog), ConversionFlag::UPDATE_GEOMETRY | ConversionFlag::UPDATE_HIERARCHY, Scale::default()))
    });
}

criterion_group!(benches, bench_convert_dialog);
criterion_main!(benches);
