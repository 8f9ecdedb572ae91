/// Lower-cases and strips the Spanish diacritics that show up in weekday and
/// measurement-unit names, so "Miércoles" and "miercoles" compare equal.
pub(crate) fn fold(value: &str) -> String {
    value
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}
