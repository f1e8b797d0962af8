//! RC → Widget converter (§4.C). Produces a generic widget tree from a parsed
//! [`Dialog`], applying class mapping, style-flag translation, geometry
//! rescaling and hierarchy adjustment the way `RcDocument::convertDialog`
//! does in the original implementation.

use bitflags::bitflags;

use crate::model::{Control, Dialog, Geometry};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ConversionFlag: u32 {
        const REMOVE_UNKNOWN      = 1 << 0;
        const SPLIT_TOOL_BAR      = 1 << 1;
        const CONVERT_TO_PNG      = 1 << 2;
        const NO_COLORS           = 1 << 3;
        const GRAY                = 1 << 4;
        const MAGENTA             = 1 << 5;
        const BOTTOM_LEFT_PIXEL   = 1 << 6;
        const UPDATE_HIERARCHY    = 1 << 7;
        const UPDATE_GEOMETRY     = 1 << 8;
        const USE_ID_FOR_PIXMAP   = 1 << 9;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub sx: f64,
    pub sy: f64,
}

impl Default for Scale {
    fn default() -> Self {
        Self { sx: 1.5, sy: 1.65 }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Widget {
    pub class: String,
    pub name: String,
    pub geometry: Geometry,
    pub properties: Vec<(String, String)>,
    pub children: Vec<Widget>,
}

impl Widget {
    fn set(&mut self, key: &str, value: impl Into<String>) {
        self.properties.push((key.to_string(), value.into()));
    }
}

fn rescale(g: Geometry, scale: Scale, flags: ConversionFlag) -> Geometry {
    if !flags.contains(ConversionFlag::UPDATE_GEOMETRY) {
        return g;
    }
    Geometry {
        x: (scale.sx * g.x as f64).round() as i32,
        y: (scale.sy * g.y as f64).round() as i32,
        w: (scale.sx * g.w as f64).ceil() as i32,
        h: (scale.sy * g.h as f64).ceil() as i32,
    }
}

/// Converts a whole dialog into its root widget, children fully mapped and
/// (if requested) reparented per the hierarchy-adjustment algorithm.
pub fn convert_dialog(dialog: &Dialog, flags: ConversionFlag, scale: Scale) -> Widget {
    let has_caption = dialog.styles.iter().any(|s| s == "WS_CAPTION") || !dialog.caption.is_empty();
    let root_class = if !dialog.menu.is_empty() {
        "QMainWindow"
    } else if has_caption {
        "QDialog"
    } else {
        "QWidget"
    };

    let mut root = Widget { class: root_class.to_string(), name: dialog.id.clone(), geometry: rescale(dialog.geometry, scale, flags), ..Default::default() };
    if !dialog.caption.is_empty() {
        root.set("windowTitle", &dialog.caption);
    }

    root.children = dialog.controls.iter().map(|c| convert_control(c, flags, scale)).collect();

    if flags.contains(ConversionFlag::UPDATE_HIERARCHY) {
        adjust_hierarchy(&mut root.children);
    }

    root
}

fn convert_control(control: &Control, flags: ConversionFlag, scale: Scale) -> Widget {
    let ty = control.control_type.to_uppercase();
    let effective_class = if ty == "CONTROL" { control.class_name.as_str() } else { ty.as_str() };

    let mut widget = Widget {
        name: control.id.clone(),
        geometry: rescale(control.geometry, scale, flags),
        ..Default::default()
    };

    widget.class = map_class(effective_class, &control.styles).to_string();
    apply_class_specific_properties(&mut widget, effective_class, control);
    apply_general_style_rewrite(&mut widget, &control.styles);

    widget
}

fn map_class(effective_class: &str, styles: &[String]) -> &'static str {
    let has = |needle: &str| styles.iter().any(|s| s.eq_ignore_ascii_case(needle));
    match effective_class.to_uppercase().as_str() {
        "LTEXT" | "CTEXT" | "RTEXT" | "STATIC" | "SYSLINK" | "ICON" => "QLabel",
        "PUSHBUTTON" | "DEFPUSHBUTTON" | "PUSHBOX" => "QPushButton",
        "AUTOCHECKBOX" | "CHECKBOX" | "STATE3" | "AUTO3STATE" => "QCheckBox",
        "AUTORADIOBUTTON" | "RADIOBUTTON" => "QRadioButton",
        "COMBOBOX" | "COMBOBOXEX32" => {
            if has("CBS_SIMPLE") {
                "QListWidget"
            } else {
                "QComboBox"
            }
        }
        "EDITTEXT" | "EDIT" => {
            if has("ES_MULTILINE") {
                "QTextEdit"
            } else {
                "QLineEdit"
            }
        }
        s if s.starts_with("RICHEDIT") => "QTextEdit",
        "GROUPBOX" => "QGroupBox",
        "LISTBOX" => "QListWidget",
        s if s.starts_with("SYSLISTVIEW") => "QListWidget",
        "SCROLLBAR" => "QScrollBar",
        s if s.starts_with("MSCTLS_TRACKBAR") => "QSlider",
        s if s.starts_with("MSCTLS_UPDOWN") => "QSpinBox",
        s if s.starts_with("MSCTLS_PROGRESS") => "QProgressBar",
        "SYSMONTHCAL32" => "QCalendarWidget",
        "SYSDATETIMEPICK32" => "QDateTimeEdit",
        "SYSIPADDRESS32" => "QLineEdit",
        s if s.starts_with("SYSTREEVIEW") || s == "MFCPROPERTYGRID" => "QTreeWidget",
        s if s.starts_with("SYSTABCONTROL") => "QTabWidget",
        _ => "QWidget",
    }
}

fn apply_class_specific_properties(widget: &mut Widget, effective_class: &str, control: &Control) {
    let styles = &control.styles;
    let has = |needle: &str| styles.iter().any(|s| s.eq_ignore_ascii_case(needle));
    if !control.text.is_empty() {
        widget.set("text", &control.text);
    }

    match widget.class.as_str() {
        "QLabel" => {
            if has("SS_CENTER") {
                widget.set("alignment", "Qt::AlignHCenter");
            } else if has("SS_RIGHT") {
                widget.set("alignment", "Qt::AlignRight");
            } else if has("SS_LEFT") {
                widget.set("alignment", "Qt::AlignLeft");
            }
            if has("SS_CENTERIMAGE") {
                widget.set("alignment", "Qt::AlignCenter");
            }
            if has("SS_SUNKEN") {
                widget.set("frameShape", "QFrame::Plain");
                widget.set("frameShadow", "QFrame::Sunken");
            }
            if has("SS_BLACKFRAME") {
                widget.set("frameShape", "QFrame::Box");
            }
            if has("SS_BITMAP") || has("SS_ICON") || effective_class.eq_ignore_ascii_case("ICON") {
                widget.set("pixmap", &control.text);
            }
        }
        "QPushButton" => {
            if effective_class.eq_ignore_ascii_case("DEFPUSHBUTTON") || has("BS_DEFPUSHBUTTON") {
                widget.set("default", "true");
            }
            if has("BS_FLAT") || effective_class.eq_ignore_ascii_case("PUSHBOX") {
                widget.set("flat", "true");
            }
        }
        "QCheckBox" => {
            if has("STATE3") || has("AUTO3STATE") {
                widget.set("tristate", "true");
            }
        }
        "QComboBox" => {
            widget.geometry.h = (22.0 / 1.65).ceil() as i32;
        }
        "QLineEdit" | "QTextEdit" => {
            if has("ES_PASSWORD") {
                widget.set("echoMode", "QLineEdit::Password");
            }
            if has("ES_READONLY") {
                widget.set("readOnly", "true");
            }
            if has("ES_CENTER") {
                widget.set("alignment", "Qt::AlignHCenter");
            } else if has("ES_RIGHT") {
                widget.set("alignment", "Qt::AlignRight");
            }
            if effective_class.eq_ignore_ascii_case("SysIPAddress32") {
                widget.set("inputMask", "000.000.000.000;_");
            }
        }
        "QListWidget" => {
            if has("LBS_EXTENDEDSEL") {
                widget.set("selectionMode", "QAbstractItemView::ExtendedSelection");
            } else if has("LBS_MULTIPLESEL") {
                widget.set("selectionMode", "QAbstractItemView::MultiSelection");
            }
            if has("WS_VSCROLL") || has("WS_HSCROLL") {
                widget.set("scrollBarPolicy", "Qt::ScrollBarAlwaysOn");
            }
            if has("LBS_DISABLENOSCROLL") {
                widget.set("scrollBarPolicy", "Qt::ScrollBarAlwaysOn");
            }
        }
        "QScrollBar" => {
            if has("SBS_VERT") {
                widget.set("orientation", "Qt::Vertical");
            } else {
                widget.set("orientation", "Qt::Horizontal");
            }
        }
        "QSlider" => {
            if has("TBS_BOTH") {
                widget.set("tickPosition", "QSlider::TicksBothSides");
            } else if has("TBS_LEFT") {
                widget.set("tickPosition", "QSlider::TicksLeft");
            } else if has("TBS_NOTICKS") {
                widget.set("tickPosition", "QSlider::NoTicks");
            }
        }
        "QDateTimeEdit" => {
            if has("DTS_SHORTDATEFORMAT") {
                widget.set("displayFormat", "M/d/yy");
            } else if has("DTS_LONGDATEFORMAT") {
                widget.set("displayFormat", "dddd, MMMM d, yyyy");
            }
        }
        "QTabWidget" => {
            if has("TCS_VERTICAL") {
                widget.set("tabPosition", "QTabWidget::West");
            } else if has("TCS_BOTTOM") {
                widget.set("tabPosition", "QTabWidget::South");
            }
        }
        _ => {}
    }
}

const CONSUMED_GENERAL_STYLES: &[&str] =
    &["WS_EX_CLIENTEDGE", "WS_EX_STATICEDGE", "WS_EX_DLGMODALFRAME", "WS_BORDER", "WS_DISABLED", "WS_TABSTOP"];

fn apply_general_style_rewrite(widget: &mut Widget, styles: &[String]) {
    for style in styles {
        let upper = style.to_uppercase();
        match upper.as_str() {
            "WS_EX_CLIENTEDGE" => {
                widget.set("frameShape", "QFrame::Panel");
                widget.set("frameShadow", "QFrame::Sunken");
            }
            "WS_EX_STATICEDGE" => {
                widget.set("frameShape", "QFrame::Panel");
                widget.set("frameShadow", "QFrame::Plain");
            }
            "WS_EX_DLGMODALFRAME" => {
                widget.set("frameShape", "QFrame::StyledPanel");
            }
            "WS_BORDER" => {
                widget.set("frameShape", "QFrame::Box");
            }
            "WS_DISABLED" => {
                widget.set("enabled", "false");
            }
            "WS_TABSTOP" => {
                widget.set("focusPolicy", "Qt::TabFocus");
            }
            _ if !CONSUMED_GENERAL_STYLES.contains(&upper.as_str()) && !is_class_specific_style(&upper) => {
                tracing::info!(target: "rc.convert", style = %style, class = %widget.class, "unconsumed style token");
            }
            _ => {}
        }
    }
}

fn is_class_specific_style(upper: &str) -> bool {
    upper.starts_with("SS_")
        || upper.starts_with("BS_")
        || upper.starts_with("ES_")
        || upper.starts_with("LBS_")
        || upper.starts_with("CBS_")
        || upper.starts_with("SBS_")
        || upper.starts_with("TBS_")
        || upper.starts_with("DTS_")
        || upper.starts_with("TCS_")
        || upper == "STATE3"
        || upper == "AUTO3STATE"
}

/// §4.C hierarchy adjustment: sort by area ascending, reparent each child
/// under the smallest strictly-containing later sibling, translate its
/// geometry into the new parent's coordinate space, and drop it from the
/// root's direct children.
fn adjust_hierarchy(children: &mut Vec<Widget>) {
    let n = children.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| area(&children[i].geometry));

    let mut parent_of: Vec<Option<usize>> = vec![None; n];
    for (rank, &i) in order.iter().enumerate() {
        for &j in &order[rank + 1..] {
            if strictly_contains(&children[j].geometry, &children[i].geometry) {
                parent_of[i] = Some(j);
                break;
            }
        }
    }

    // Every translation must read the parent's original absolute position,
    // not a possibly-already-translated one: a child at index i can have a
    // parent at index `parent < i` that this same loop already shifted into
    // its own parent's coordinate space, so reading `children[parent]` live
    // would double-translate grandchildren three or more levels deep.
    let original: Vec<(i32, i32)> = children.iter().map(|w| (w.geometry.x, w.geometry.y)).collect();
    for i in 0..n {
        if let Some(parent) = parent_of[i] {
            let (px, py) = original[parent];
            children[i].geometry.x -= px;
            children[i].geometry.y -= py;
        }
    }

    let mut children_map: std::collections::HashMap<usize, Vec<usize>> = std::collections::HashMap::new();
    for (i, parent) in parent_of.iter().enumerate() {
        if let Some(p) = parent {
            children_map.entry(*p).or_default().push(i);
        }
    }

    let mut taken: Vec<Option<Widget>> = std::mem::take(children).into_iter().map(Some).collect();
    let roots: Vec<usize> = (0..n).filter(|i| parent_of[*i].is_none()).collect();
    *children = roots.into_iter().map(|i| build_subtree(i, &mut taken, &children_map)).collect();
}

fn build_subtree(i: usize, taken: &mut [Option<Widget>], children_map: &std::collections::HashMap<usize, Vec<usize>>) -> Widget {
    let mut widget = taken[i].take().expect("each node is attached at most once");
    if let Some(kids) = children_map.get(&i) {
        for &k in kids {
            widget.children.push(build_subtree(k, taken, children_map));
        }
    }
    widget
}

fn area(g: &Geometry) -> i64 {
    g.w as i64 * g.h as i64
}

fn strictly_contains(outer: &Geometry, inner: &Geometry) -> bool {
    let outer_is_bigger = area(outer) > area(inner);
    outer_is_bigger
        && inner.x >= outer.x
        && inner.y >= outer.y
        && inner.x + inner.w <= outer.x + outer.w
        && inner.y + inner.h <= outer.y + outer.h
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Control;

    #[test]
    fn rescales_geometry_with_default_scale() {
        let g = Geometry { x: 50, y: 70, w: 50, h: 14 };
        let scaled = rescale(g, Scale::default(), ConversionFlag::UPDATE_GEOMETRY);
        assert_eq!(scaled, Geometry { x: 75, y: 116, w: 75, h: 24 });
    }

    #[test]
    fn converts_about_dialog_pushbutton() {
        let dialog = Dialog {
            id: "IDD_ABOUT".to_string(),
            geometry: Geometry { x: 0, y: 0, w: 200, h: 100 },
            caption: "About".to_string(),
            controls: vec![Control {
                control_type: "PUSHBUTTON".to_string(),
                text: "OK".to_string(),
                id: "IDOK".to_string(),
                geometry: Geometry { x: 50, y: 70, w: 50, h: 14 },
                ..Default::default()
            }],
            ..Default::default()
        };
        let widget = convert_dialog(&dialog, ConversionFlag::UPDATE_GEOMETRY, Scale::default());
        assert_eq!(widget.class, "QDialog");
        assert!(widget.properties.contains(&("windowTitle".to_string(), "About".to_string())));
        assert_eq!(widget.children[0].class, "QPushButton");
        assert_eq!(widget.children[0].geometry, Geometry { x: 75, y: 116, w: 75, h: 24 });
    }

    #[test]
    fn maps_multiline_edit_to_text_edit() {
        let control = Control {
            control_type: "EDITTEXT".to_string(),
            styles: vec!["ES_MULTILINE".to_string()],
            ..Default::default()
        };
        let widget = convert_control(&control, ConversionFlag::empty(), Scale::default());
        assert_eq!(widget.class, "QTextEdit");
    }

    #[test]
    fn uses_main_window_when_menu_present() {
        let dialog = Dialog { id: "IDD_MAIN".to_string(), menu: "IDR_MAIN".to_string(), ..Default::default() };
        let widget = convert_dialog(&dialog, ConversionFlag::empty(), Scale::default());
        assert_eq!(widget.class, "QMainWindow");
    }

    #[test]
    fn hierarchy_adjustment_reparents_and_translates() {
        let mut children = vec![
            Widget { class: "QGroupBox".to_string(), name: "group".to_string(), geometry: Geometry { x: 10, y: 10, w: 100, h: 100 }, ..Default::default() },
            Widget { class: "QLabel".to_string(), name: "label".to_string(), geometry: Geometry { x: 20, y: 20, w: 30, h: 10 }, ..Default::default() },
        ];
        adjust_hierarchy(&mut children);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "group");
        assert_eq!(children[0].children.len(), 1);
        assert_eq!(children[0].children[0].geometry, Geometry { x: 10, y: 10, w: 30, h: 10 });
    }

    #[test]
    fn hierarchy_adjustment_translates_three_levels_from_original_coordinates() {
        // A (0,0,200,200) contains B (10,10,100,100) contains C (20,20,10,10).
        // C's absolute position is (20,20); relative to B it must land at
        // (10,10), never at (10,10) minus B's own (already-translated)
        // offset from A, which would double-subtract and land at (0,0).
        let mut children = vec![
            Widget { class: "QWidget".to_string(), name: "a".to_string(), geometry: Geometry { x: 0, y: 0, w: 200, h: 200 }, ..Default::default() },
            Widget { class: "QWidget".to_string(), name: "b".to_string(), geometry: Geometry { x: 10, y: 10, w: 100, h: 100 }, ..Default::default() },
            Widget { class: "QWidget".to_string(), name: "c".to_string(), geometry: Geometry { x: 20, y: 20, w: 10, h: 10 }, ..Default::default() },
        ];
        adjust_hierarchy(&mut children);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "a");
        let b = &children[0].children[0];
        assert_eq!(b.name, "b");
        assert_eq!(b.geometry, Geometry { x: 10, y: 10, w: 100, h: 100 });
        let c = &b.children[0];
        assert_eq!(c.name, "c");
        assert_eq!(c.geometry, Geometry { x: 10, y: 10, w: 10, h: 10 });
    }
}
