//! Text normalization for names, usernames and CPF numbers

/// Replace Portuguese diacritics with their base letter
pub fn fold_accents(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            'ñ' => 'n',
            'Ñ' => 'N',
            other => other,
        })
        .collect()
}

/// Trim, fold accents, lowercase and collapse inner whitespace
///
/// `"  Ana  Luíza "` becomes `"ana luiza"`.
pub fn normalize_name(input: &str) -> String {
    fold_accents(input)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Username derived from a full name: normalized words joined by dots
///
/// A typed username maps to itself, so `"Ana Souza"` and `"ana.souza"`
/// both give `"ana.souza"`.
pub fn username_for(full_name: &str) -> String {
    normalize_name(full_name)
        .split(|c: char| c == ' ' || c == '.')
        .filter(|word| !word.is_empty())
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// Keep only ASCII digits (`"123.456.789-09"` becomes `"12345678909"`)
pub fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}
