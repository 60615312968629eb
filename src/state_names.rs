//! Brazilian state names for display
//! Maps two-letter UF codes from the order export to full state names

use std::collections::HashMap;
use std::sync::LazyLock;

pub static STATE_NAMES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    // Southeast
    m.insert("SP", "São Paulo");
    m.insert("RJ", "Rio de Janeiro");
    m.insert("MG", "Minas Gerais");
    m.insert("ES", "Espírito Santo");

    // South
    m.insert("RS", "Rio Grande do Sul");
    m.insert("PR", "Paraná");
    m.insert("SC", "Santa Catarina");

    // Northeast
    m.insert("BA", "Bahia");
    m.insert("PE", "Pernambuco");
    m.insert("CE", "Ceará");
    m.insert("MA", "Maranhão");
    m.insert("PB", "Paraíba");
    m.insert("RN", "Rio Grande do Norte");
    m.insert("AL", "Alagoas");
    m.insert("PI", "Piauí");
    m.insert("SE", "Sergipe");

    // Center-West
    m.insert("DF", "Distrito Federal");
    m.insert("GO", "Goiás");
    m.insert("MT", "Mato Grosso");
    m.insert("MS", "Mato Grosso do Sul");

    // North
    m.insert("PA", "Pará");
    m.insert("AM", "Amazonas");
    m.insert("TO", "Tocantins");
    m.insert("RO", "Rondônia");
    m.insert("AC", "Acre");
    m.insert("AP", "Amapá");
    m.insert("RR", "Roraima");

    m
});

/// Full state name, or the code itself when it is not a known UF
pub fn get_state_name(code: &str) -> String {
    let code = code.trim();
    STATE_NAMES
        .get(code.to_uppercase().as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_state() {
        assert_eq!(get_state_name("SP"), "São Paulo");
        assert_eq!(get_state_name("rj"), "Rio de Janeiro");
    }

    #[test]
    fn test_unknown_state_keeps_code() {
        assert_eq!(get_state_name("XX"), "XX");
    }

    #[test]
    fn test_all_federative_units_present() {
        assert_eq!(STATE_NAMES.len(), 27);
    }
}
