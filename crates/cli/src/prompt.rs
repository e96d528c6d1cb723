use std::io::{self, BufRead, Write};

/// Asks to confirm submission. Only `y` or `Y` confirms.
pub fn confirm(mut input: impl BufRead, mut output: impl Write) -> io::Result<bool> {
    writeln!(output, "Do you confirm to submit the deal?")?;
    write!(output, "Press Y/y to continue, other key to quit: ")?;
    output.flush()?;

    let mut response = String::new();
    input.read_line(&mut response)?;
    Ok(response.trim().eq_ignore_ascii_case("y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn answer(text: &str) -> bool {
        confirm(Cursor::new(text.as_bytes()), Vec::new()).unwrap()
    }

    #[test]
    fn test_confirm() {
        assert!(answer("y\n"));
        assert!(answer("Y\n"));
        assert!(answer("Y"));
        assert!(!answer("yes\n"));
        assert!(!answer("n\n"));
        assert!(!answer(""));
    }

    #[test]
    fn test_prompt_text() {
        let mut output = Vec::new();
        confirm(Cursor::new(b"n\n".as_slice()), &mut output).unwrap();
        assert!(String::from_utf8(output).unwrap().contains("Y/y"));
    }
}
