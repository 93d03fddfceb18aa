use std::io::{self, Write};

use serde::Serialize;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let mut stdout = io::stdout();
        Self::write_json(&mut stdout, value)
    }

    pub fn write_json<W: Write, T: Serialize>(writer: &mut W, value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn writes_pretty_json_line() {
        let mut buf = Vec::new();
        JsonOutput::write_json(&mut buf, &json!({"row_id": "abc"})).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "{\n  \"row_id\": \"abc\"\n}\n"
        );
    }
}
