/// Split one CSV line into trimmed fields.
///
/// Minimal dialect: every `"` toggles the quoted state and is dropped, commas
/// only separate fields outside quotes. There is no escaped-quote handling.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for ch in line.chars() {
        match ch {
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());

    fields
}
