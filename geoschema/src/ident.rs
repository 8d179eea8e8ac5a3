//! Validation et quoting des identifiants SQL
//!
//! Tout nom de table ou de colonne issu de l'entrée utilisateur ou d'un
//! document passe par [`quote`] avant d'être placé dans une requête.

use crate::IdentError;

/// NAMEDATALEN - 1 côté PostgreSQL
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Vérifie qu'un identifiant est utilisable tel quel une fois quoté
pub fn validate(name: &str) -> Result<&str, IdentError> {
    if name.is_empty() {
        return Err(IdentError::Empty);
    }
    if name.contains('\0') {
        return Err(IdentError::Nul);
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(IdentError::TooLong(name.to_string()));
    }
    Ok(name)
}

/// Entoure l'identifiant de guillemets doubles (casse conservée, `"` doublés)
pub fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `"schema"."table"`
pub fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote(schema), quote(table))
}

/// Normalise un nom de table saisi par l'utilisateur.
///
/// Les tirets deviennent des underscores et le nom est mis en minuscules,
/// ce qui correspond au repli de casse d'un identifiant non quoté.
pub fn sanitize_table_name(raw: &str) -> Result<String, IdentError> {
    let name = raw.trim().replace('-', "_").to_lowercase();
    validate(&name)?;
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(quote("NAME"), "\"NAME\"");
        assert_eq!(quote("prim fuel"), "\"prim fuel\"");
        assert_eq!(quote("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote("x\"; DROP TABLE t; --"), "\"x\"\"; DROP TABLE t; --\"");
    }

    #[test]
    fn test_qualified() {
        assert_eq!(qualified("public", "power_plants"), "\"public\".\"power_plants\"");
    }

    #[test]
    fn test_sanitize_table_name() {
        assert_eq!(sanitize_table_name("utah-dams").unwrap(), "utah_dams");
        assert_eq!(sanitize_table_name(" Power-Plants ").unwrap(), "power_plants");
        assert_eq!(sanitize_table_name("   "), Err(IdentError::Empty));
    }

    #[test]
    fn test_validate() {
        assert!(validate("ok").is_ok());
        assert_eq!(validate(""), Err(IdentError::Empty));
        assert_eq!(validate("a\0b"), Err(IdentError::Nul));
        let long = "x".repeat(64);
        assert!(matches!(validate(&long), Err(IdentError::TooLong(_))));
        assert!(validate(&"x".repeat(63)).is_ok());
    }
}
