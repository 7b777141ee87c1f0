// Operator table. The parser encodes operator identifiers as `#<symbol>`
// tokens; everything downstream resolves them here.

/// Identifier of the constructor pseudo-operator.
pub const CONSTRUCTOR: &str = "#constructor";
/// Identifier of the boolean-cast operator used by condition coercion.
pub const BOOL_CAST: &str = "#bool";

/// `(symbol, canonical name)` for every operator the language defines.
/// Declaration order is the tie-break order everywhere it matters.
pub const OPERATORS: &[(&str, &str)] = &[
    ("=", "eq"),
    ("+=", "pluseq"),
    ("-=", "minuseq"),
    ("*=", "muleq"),
    ("/=", "diveq"),
    ("%=", "modeq"),
    ("+", "plus"),
    ("-", "minus"),
    ("*", "mul"),
    ("/", "div"),
    ("%", "mod"),
    ("==", "eqeq"),
    ("!=", "noteq"),
    ("<", "lt"),
    (">", "gt"),
    ("<=", "lteq"),
    (">=", "gteq"),
    ("&&", "and"),
    ("||", "or"),
    ("&", "bitand"),
    ("|", "bitor"),
    ("^", "bitxor"),
    ("<<", "shl"),
    (">>", "shr"),
    ("[]", "index"),
    ("()", "call"),
    ("bool", "bool"),
    ("constructor", "constructor"),
];

/// `#<symbol>` identifier for an operator symbol.
pub fn identifier_for(symbol: &str) -> String {
    format!("#{}", symbol)
}

pub fn is_operator(identifier: &str) -> bool {
    identifier.starts_with('#')
}

/// Canonical name for an operator identifier, if the symbol is known.
pub fn canonical_name(identifier: &str) -> Option<&'static str> {
    let symbol = identifier.strip_prefix('#')?;
    OPERATORS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, name)| *name)
}

/// Render an identifier for diagnostics: operators become `op<symbol>`,
/// regular identifiers pass through.
pub fn nice_name(identifier: &str) -> String {
    match identifier.strip_prefix('#') {
        Some(symbol) => format!("op{}", symbol),
        None => identifier.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names() {
        assert_eq!(canonical_name("#+"), Some("plus"));
        assert_eq!(canonical_name("#="), Some("eq"));
        assert_eq!(canonical_name("#constructor"), Some("constructor"));
        assert_eq!(canonical_name("#??"), None);
        assert_eq!(canonical_name("plain"), None);
    }

    #[test]
    fn test_nice_names() {
        assert_eq!(nice_name("#+"), "op+");
        assert_eq!(nice_name("main"), "main");
    }
}
