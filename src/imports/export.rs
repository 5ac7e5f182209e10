use super::repo_types::ImportedUser;

const HEADER: &str =
    "full_name,postal_code,birthday,generated_email,generated_password,created_at";

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render imported users as CSV, header first, `\r\n` line endings.
pub fn to_csv(users: &[ImportedUser]) -> String {
    let mut out = String::from(HEADER);
    out.push_str("\r\n");
    for u in users {
        let created_at = u
            .created_at
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        let line = [
            u.full_name.as_str(),
            u.postal_code.as_str(),
            u.birthday.as_str(),
            u.generated_email.as_str(),
            u.generated_password.as_str(),
            created_at.as_str(),
        ]
        .map(escape)
        .join(",");
        out.push_str(&line);
        out.push_str("\r\n");
    }
    out
}
