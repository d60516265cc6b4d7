use rand::Rng;
use rand::seq::IndexedRandom;

use crate::consts;
use ducat_types::models::{HintEntry, PasswordHint};

const LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";
const MSG_CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890";
const MSG_CODE_DIGITS: &[u8] = b"1234567890";

/// Bank passwords: 1..=6 characters, lowercase letters and digits only.
pub fn is_valid_password(password: &str) -> bool {
    !password.is_empty()
        && password.len() <= consts::PASSWORD_MAX_LEN
        && is_clean_text(password, "")
}

/// True when every character (lowercased) is a latin letter, a digit, or
/// one of `extra`.
pub fn is_clean_text(text: &str, extra: &str) -> bool {
    text.chars().all(|c| {
        let c = c.to_ascii_lowercase();
        c.is_ascii_lowercase() || c.is_ascii_digit() || extra.contains(c)
    })
}

/// Charset allowed in report comments.
pub fn is_clean_comment(text: &str) -> bool {
    is_clean_text(text, " .,:;?!()-")
}

/// Per-character feedback for a guess against the true password. Digits
/// and letters never hint across kinds; digits compare numerically,
/// letters by alphabet position (with the direction inverted relative to
/// digits, as shipped). Positions beyond the password's length get
/// [`PasswordHint::Extra`].
pub fn password_hints(actual: &str, guess: &str) -> Vec<HintEntry> {
    let actual: Vec<char> = actual.chars().collect();

    guess
        .chars()
        .enumerate()
        .map(|(i, g)| {
            let hint = match actual.get(i) {
                None => PasswordHint::Extra,
                Some(&a) if a == g => PasswordHint::Match,
                Some(&a) if a.is_ascii_digit() != g.is_ascii_digit() => PasswordHint::WrongKind,
                Some(&a) if a.is_ascii_digit() => {
                    if g > a {
                        PasswordHint::Down
                    } else {
                        PasswordHint::Up
                    }
                }
                Some(&a) => {
                    let pos = |c: char| LETTERS.find(c).unwrap_or(0);
                    if pos(g) < pos(a) {
                        PasswordHint::Down
                    } else {
                        PasswordHint::Up
                    }
                }
            };
            HintEntry { guessed: g, hint }
        })
        .collect()
}

/// Msg codes are 4 characters, leading digit, uppercase alphanumerics.
pub fn is_msg_code(text: &str) -> bool {
    text.chars().count() == 4 && text.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Draw a fresh msg code not present in `used` (compared lowercased).
pub fn generate_msg_code<R: Rng + ?Sized>(used: &[String], rng: &mut R) -> String {
    loop {
        let mut code = String::with_capacity(4);
        code.push(*MSG_CODE_DIGITS.choose(rng).expect("non-empty") as char);
        for _ in 0..3 {
            code.push(*MSG_CODE_CHARS.choose(rng).expect("non-empty") as char);
        }
        if !used.iter().any(|u| u.eq_ignore_ascii_case(&code)) {
            return code;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn password_validation() {
        assert!(is_valid_password("a1b2c3"));
        assert!(is_valid_password("z"));
        assert!(!is_valid_password(""));
        assert!(!is_valid_password("abcdefg"));
        assert!(!is_valid_password("ab-c"));
        assert!(!is_valid_password("пароль"));
    }

    #[test]
    fn hints_exact_match() {
        let hints = password_hints("ab1", "ab1");
        assert!(hints.iter().all(|h| h.hint == PasswordHint::Match));
    }

    #[test]
    fn hints_digit_direction() {
        // True digit 5: guessing 7 points down, guessing 2 points up.
        let hints = password_hints("5", "7");
        assert_eq!(hints[0].hint, PasswordHint::Down);
        let hints = password_hints("5", "2");
        assert_eq!(hints[0].hint, PasswordHint::Up);
    }

    #[test]
    fn hints_letter_direction_is_inverted() {
        // True letter "m": an earlier guess points down, a later one up.
        let hints = password_hints("m", "c");
        assert_eq!(hints[0].hint, PasswordHint::Down);
        let hints = password_hints("m", "x");
        assert_eq!(hints[0].hint, PasswordHint::Up);
    }

    #[test]
    fn hints_kind_and_overflow() {
        let hints = password_hints("a1", "1abc");
        assert_eq!(hints[0].hint, PasswordHint::WrongKind);
        assert_eq!(hints[1].hint, PasswordHint::WrongKind);
        assert_eq!(hints[2].hint, PasswordHint::Extra);
        assert_eq!(hints[3].hint, PasswordHint::Extra);
    }

    #[test]
    fn msg_code_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        let code = generate_msg_code(&[], &mut rng);
        assert!(is_msg_code(&code));

        // Regeneration skips used codes regardless of case.
        let used = vec![code.to_lowercase()];
        let next = generate_msg_code(&used, &mut rng);
        assert_ne!(next.to_lowercase(), used[0]);
    }

    #[test]
    fn comment_charset() {
        assert!(is_clean_comment("spam, again?! (third time)"));
        assert!(!is_clean_comment("nice try <script>"));
    }
}
