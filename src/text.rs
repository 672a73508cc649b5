use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::Document;

const SAMPLE_TEXT: &str = "サンプルテキスト";
const RANDOM_LABEL: &str = "ランダム文字";

/// Length of the random suffix of a numbered record.
pub const SUFFIX_LEN: usize = 10;

/// `len` letters drawn uniformly from `a..=z`.
pub fn random_lowercase<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    let letters = Uniform::new_inclusive(b'a', b'z');
    (0..len).map(|_| char::from(letters.sample(rng))).collect()
}

/// The `i`th record of a generated dataset.
pub fn numbered_record<R: Rng + ?Sized>(rng: &mut R, i: u64) -> Document {
    Document::new(format!(
        "{SAMPLE_TEXT} {i} {RANDOM_LABEL} {}",
        random_lowercase(rng, SUFFIX_LEN)
    ))
}

pub fn large_text() -> String {
    format!("{SAMPLE_TEXT} 1 {}", RANDOM_LABEL.repeat(100))
}

pub fn small_text() -> String {
    format!("{SAMPLE_TEXT} 1")
}

/// The same word ten times over.
pub fn high_duplication_text() -> String {
    format!("{SAMPLE_TEXT} ").repeat(10)
}

pub fn low_duplication_text() -> String {
    format!("{SAMPLE_TEXT} 1 {}", RANDOM_LABEL.repeat(8))
}
