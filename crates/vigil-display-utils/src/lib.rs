//! Formatting helpers used by the `Display` implementations of the vigil
//! crates.
//!
//! Automata, configurations and canonical words are all rendered as nested
//! collections. The helpers in this crate keep those renderings uniform:
//! comma-joined sequences, brace-wrapped sets, bracket-wrapped sequences and
//! block indentation.

use std::fmt::Display;

/// Width of one indentation level.
pub const INDENT_WIDTH: usize = 4;

/// Join the items of an iterator with the given separator.
///
/// The separator is only placed between items, never at either end.
///
/// # Example
///
/// ```
/// use vigil_display_utils::comma_joined;
///
/// assert_eq!(comma_joined(["x", "y", "z"], " + "), "x + y + z");
/// assert_eq!(comma_joined(Vec::<u32>::new(), ", "), "");
/// ```
pub fn comma_joined<T: Display>(items: impl IntoIterator<Item = T>, sep: &str) -> String {
    let mut out = String::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        out.push_str(&item.to_string());
    }
    out
}

/// Render a collection as a brace-wrapped, comma-separated set.
///
/// An empty collection is rendered as `{}`.
///
/// # Example
///
/// ```
/// use vigil_display_utils::braced;
///
/// assert_eq!(braced([1, 2, 3]), "{ 1, 2, 3 }");
/// assert_eq!(braced(Vec::<u32>::new()), "{}");
/// ```
pub fn braced<T: Display>(items: impl IntoIterator<Item = T>) -> String {
    let inner = comma_joined(items, ", ");
    if inner.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {inner} }}")
    }
}

/// Render a collection as a bracket-wrapped, comma-separated sequence.
///
/// An empty collection is rendered as `[]`.
///
/// # Example
///
/// ```
/// use vigil_display_utils::bracketed;
///
/// assert_eq!(bracketed(["a", "b"]), "[ a, b ]");
/// assert_eq!(bracketed(Vec::<&str>::new()), "[]");
/// ```
pub fn bracketed<T: Display>(items: impl IntoIterator<Item = T>) -> String {
    let inner = comma_joined(items, ", ");
    if inner.is_empty() {
        "[]".to_string()
    } else {
        format!("[ {inner} ]")
    }
}

/// Indent every non-empty line of a text block by one level.
///
/// # Example
///
/// ```
/// use vigil_display_utils::indented;
///
/// assert_eq!(indented("a\nb\n"), "    a\n    b\n");
/// ```
pub fn indented(block: &str) -> String {
    let mut out = String::new();
    for line in block.split_inclusive('\n') {
        if line.trim_end_matches('\n').is_empty() {
            out.push_str(line);
        } else {
            out.push_str(&" ".repeat(INDENT_WIDTH));
            out.push_str(line);
        }
    }
    out
}

/// Render the items of a collection in a stable, sorted order.
///
/// Useful for collections whose iteration order is unspecified.
///
/// # Example
///
/// ```
/// use vigil_display_utils::sorted_joined;
///
/// assert_eq!(sorted_joined(["c", "a", "b"], ", "), "a, b, c");
/// ```
pub fn sorted_joined<T: Display>(items: impl IntoIterator<Item = T>, sep: &str) -> String {
    let mut rendered: Vec<_> = items.into_iter().map(|i| i.to_string()).collect();
    rendered.sort();
    comma_joined(rendered, sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joining_skips_trailing_separator() {
        assert_eq!(comma_joined([1], ", "), "1");
        assert_eq!(comma_joined([1, 2], "; "), "1; 2");
    }

    #[test]
    fn indentation_preserves_blank_lines() {
        assert_eq!(indented("x\n\ny\n"), "    x\n\n    y\n");
    }
}
