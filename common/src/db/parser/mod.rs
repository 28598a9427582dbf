pub mod def;
pub mod lef;

/// Splits a DEF/LEF line into tokens, separating parentheses and
/// semicolons even when the source omits the surrounding whitespace.
pub(crate) fn tokenize(line: &str) -> Vec<String> {
    let line = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };
    line.replace('(', " ( ")
        .replace(')', " ) ")
        .replace(';', " ; ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
