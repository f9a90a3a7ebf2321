//! Dictionary file format: text, one word per line, trailing whitespace
//! stripped. Empty lines are not ignored - they become zero-length
//! words, which then fail `load_dictionary`/`search` validation exactly
//! like any other malformed word would further down the stack.

use std::fs;
use std::io;
use std::path::Path;

pub fn read_dictionary_file(path: &Path) -> io::Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents.lines().map(|line| line.trim_end().to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn strips_trailing_whitespace_and_keeps_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "hest ").unwrap();
        writeln!(file, "").unwrap();
        writeln!(file, "heste\t").unwrap();
        let words = read_dictionary_file(file.path()).unwrap();
        assert_eq!(words, vec!["hest", "", "heste"]);
    }
}
