//! Canonicalization of resolver identifiers into catalog-style aliases.
//!
//! SIMBAD identifiers are whitespace-separated tokens such as `M 31`,
//! `* alf Cen` or `NAME Andromeda Galaxy`. The catalog writes names without
//! the space after the catalog designator (`M31`), so the first token is
//! glued to the rest unless it is a bracketed designator like `[VV2006]`.

/// Leading tokens that mark an object class rather than part of a name.
const DESIGNATOR_PREFIXES: [&str; 3] = ["*", "**", "V*"];

/// Token introducing a common name.
const COMMON_NAME_TOKEN: &str = "NAME";

/// Build the alias list of `target` from raw resolver identifiers.
///
/// Common names (`NAME …`) are moved to the front, designator prefixes are
/// dropped, and `target` itself is appended when no alias equals it.
pub fn canonicalize(target: &str, identifiers: &[String]) -> Vec<String> {
    let mut aliases: Vec<String> = Vec::with_capacity(identifiers.len() + 1);

    for identifier in identifiers {
        let mut tokens: Vec<&str> = identifier.split_whitespace().collect();
        let Some(first) = tokens.first_mut() else {
            continue;
        };
        if DESIGNATOR_PREFIXES.contains(first) {
            *first = "";
        }

        if tokens[0] == COMMON_NAME_TOKEN {
            let name = tokens[1..].join(" ");
            if name.is_empty() {
                continue;
            }
            match aliases.first_mut() {
                Some(front) => {
                    let previous = std::mem::replace(front, name);
                    aliases.push(previous);
                }
                None => aliases.push(name),
            }
            continue;
        }

        let alias = if tokens[0].ends_with(']') {
            tokens.join(" ")
        } else {
            format!("{}{}", tokens[0], tokens[1..].join(" "))
        };
        if !alias.is_empty() {
            aliases.push(alias);
        }
    }

    if !aliases.iter().any(|alias| alias == target) {
        aliases.push(target.to_string());
    }
    aliases
}
