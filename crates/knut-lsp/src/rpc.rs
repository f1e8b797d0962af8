//! Minimal stdio JSON-RPC framing for the Language Server Protocol
//! (`Content-Length: N\r\n\r\n{...}`), the wire format every LSP server
//! speaks regardless of language.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{ChildStdin, ChildStdout};

use serde_json::Value;

use crate::error::LspError;

pub fn write_message(stdin: &mut ChildStdin, value: &Value) -> Result<(), LspError> {
    let body = serde_json::to_vec(value)?;
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    stdin.write_all(header.as_bytes())?;
    stdin.write_all(&body)?;
    stdin.flush()?;
    Ok(())
}

pub fn read_message(reader: &mut BufReader<ChildStdout>) -> Result<Option<Value>, LspError> {
    let mut content_length: Option<usize> = None;
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some(rest) = line.strip_prefix("Content-Length:") {
            content_length = rest.trim().parse().ok();
        }
    }
    let Some(len) = content_length else {
        return Err(LspError::Protocol("message header missing Content-Length".to_string()));
    };
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(Some(serde_json::from_slice(&buf)?))
}
