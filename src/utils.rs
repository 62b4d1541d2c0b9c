use chrono::{DateTime, Utc};
use rand::Rng;

const ID_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 5;

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Client-side item id: `<prefix>_<unix millis>_<5 random base36 chars>`.
///
/// Not cryptographically secure. Ids are minted by a human clicking "Add",
/// so a collision inside the same millisecond is not a practical concern.
pub fn generate_id(prefix: &str) -> String {
    generate_id_at(prefix, Utc::now())
}

pub fn generate_id_at(prefix: &str, now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.random_range(0..ID_SUFFIX_ALPHABET.len());
            char::from(ID_SUFFIX_ALPHABET[idx])
        })
        .collect();
    format!("{}_{}_{}", prefix, now.timestamp_millis(), suffix)
}

/// `YYYY-MM-DD`, used to stamp exported file names.
pub fn date_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn normalize_adds_scheme_and_strips_slash() {
        assert_eq!(normalize_url(" api.example.uz/api/ "), "https://api.example.uz/api");
        assert_eq!(normalize_url("http://localhost:5000/api"), "http://localhost:5000/api");
        assert_eq!(normalize_url("   "), "");
    }

    #[test]
    fn generated_ids_carry_prefix_and_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
        let id = generate_id_at("stat", now);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "stat");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), ID_SUFFIX_LEN);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_ids_differ_between_calls() {
        let now = Utc::now();
        let a = generate_id_at("faq", now);
        let b = generate_id_at("faq", now);
        assert_ne!(a, b);
    }

    #[test]
    fn date_stamp_is_iso_day() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 23, 59, 0).unwrap();
        assert_eq!(date_stamp(now), "2026-01-05");
    }
}
