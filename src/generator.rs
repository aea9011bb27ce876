use crate::encoder::encode;
use crate::error::{PwmError, Result};
use crate::hash::{hash, Algorithm};
use tracing::debug;
use zeroize::Zeroizing;

pub const FULL_CHARSET: &str = concat!(
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz",
    "0123456789`~!@#$%^&*()_-+={}|[]\\:\";'<>?,./"
);

pub const MAX_ITERATIONS: usize = 1000;

#[derive(Clone)]
pub struct DerivationRequest {
    pub algorithm: Algorithm,
    pub master_secret: Zeroizing<String>,
    pub context: String,
    pub length: usize,
    pub alphabet: String,
    pub prefix: String,
    pub suffix: String,
}

impl std::fmt::Debug for DerivationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivationRequest")
            .field("algorithm", &self.algorithm)
            .field("master_secret", &"<redacted>")
            .field("context", &self.context)
            .field("length", &self.length)
            .field("alphabet", &self.alphabet)
            .field("prefix", &self.prefix)
            .field("suffix", &self.suffix)
            .finish()
    }
}

pub fn derive(
    algorithm: Algorithm,
    master_secret: &str,
    context: &str,
    length: usize,
    alphabet: &str,
    prefix: &str,
    suffix: &str,
) -> Result<Zeroizing<String>> {
    generate_password(&DerivationRequest {
        algorithm,
        master_secret: Zeroizing::new(master_secret.to_string()),
        context: context.to_string(),
        length,
        alphabet: alphabet.to_string(),
        prefix: prefix.to_string(),
        suffix: suffix.to_string(),
    })
}

pub fn generate_password(request: &DerivationRequest) -> Result<Zeroizing<String>> {
    let alphabet: Vec<char> = request.alphabet.chars().collect();

    // A one-character alphabet never divides the digest down to zero.
    if alphabet.len() < 2 {
        return Err(PwmError::validation(format!(
            "The charset {:?} contains less than 2 characters.",
            request.alphabet
        )));
    }
    if request.length == 0 {
        return Err(PwmError::validation("Password length must be at least 1"));
    }
    if !request.algorithm.is_available() {
        return Err(PwmError::UnsupportedAlgorithm {
            name: request.algorithm.name().to_string(),
            valid: crate::hash::valid_algorithm_names(),
        });
    }

    let master = request.master_secret.as_bytes();
    let data = request.context.as_bytes();

    let mut password = Zeroizing::new(String::new());
    let mut produced = 0usize;
    let mut iterations = 0usize;

    while produced < request.length {
        if iterations == MAX_ITERATIONS {
            return Err(PwmError::IterationBudgetExhausted {
                produced,
                required: request.length,
            });
        }

        let key = iteration_key(master, iterations);

        let digest = if request.algorithm.is_hmac() {
            Zeroizing::new(hash(request.algorithm, &key, data)?)
        } else {
            let mut input = Zeroizing::new(Vec::with_capacity(key.len() + data.len()));
            input.extend_from_slice(&key);
            input.extend_from_slice(data);
            Zeroizing::new(hash(request.algorithm, &[], &input)?)
        };

        let chunk = Zeroizing::new(encode(&digest, &alphabet));
        produced += chunk.chars().count();
        password.push_str(&chunk);
        iterations += 1;
    }

    debug!(
        algorithm = %request.algorithm,
        length = request.length,
        iterations,
        "derived password"
    );

    Ok(splice(
        &password,
        &request.prefix,
        &request.suffix,
        request.length,
    ))
}

/// The master secret alone on the first round, then `secret\n<i>`.
fn iteration_key(master: &[u8], iteration: usize) -> Zeroizing<Vec<u8>> {
    let mut key = Zeroizing::new(master.to_vec());
    if iteration > 0 {
        key.push(b'\n');
        key.extend_from_slice(iteration.to_string().as_bytes());
    }
    key
}

fn splice(body: &str, prefix: &str, suffix: &str, length: usize) -> Zeroizing<String> {
    let mut out = Zeroizing::new(String::with_capacity(prefix.len() + body.len()));
    out.push_str(prefix);
    out.push_str(body);

    if !suffix.is_empty() {
        let keep = length.saturating_sub(suffix.chars().count());
        let mut trimmed: Zeroizing<String> = Zeroizing::new(out.chars().take(keep).collect());
        trimmed.push_str(suffix);
        out = trimmed;
    }

    Zeroizing::new(out.chars().take(length).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::available_algorithms;
    use std::collections::HashSet;

    fn full(alg: Algorithm, length: usize) -> String {
        derive(alg, "test", "example.com", length, FULL_CHARSET, "", "")
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_full_charset_size() {
        assert_eq!(FULL_CHARSET.chars().count(), 94);
        let unique: HashSet<_> = FULL_CHARSET.chars().collect();
        assert_eq!(unique.len(), 94, "charset contains duplicates");
    }

    #[test]
    fn test_regression_md5() {
        assert_eq!(full(Algorithm::Md5, 8), "E+\"mh2+-");
    }

    #[test]
    fn test_regression_md5_multiple_rounds() {
        assert_eq!(full(Algorithm::Md5, 32), "E+\"mh2+-7l[HjEaYvB_XILReV#A>K?ah");
    }

    #[test]
    fn test_regression_all_algorithms() {
        let cases = [
            (Algorithm::HmacMd5, "Ky/]O)+1O'@]/gc<.QKAGVL6mzj6^CWk"),
            (Algorithm::Sha1, "E5B%N@r[&xbF1eAr=bg-{4F+:FV/Qe7P"),
            (Algorithm::HmacSha1, "B/qFJ1kU|!LV^_'?yRcMs3k3f)tOmr/L"),
            (Algorithm::Sha256, "dpvA{s*oDHh;\\ZnS8g|0J}NY6lX}rnw\\"),
            (Algorithm::HmacSha256, ";naJL#RWS=^iq:7\\~A6pXfPzn58#:gFR"),
        ];

        for (alg, expected) in cases {
            assert_eq!(full(alg, 32), expected, "mismatch for {}", alg);
        }
    }

    #[cfg(feature = "legacy")]
    #[test]
    fn test_regression_legacy_algorithms() {
        assert_eq!(full(Algorithm::Md4, 8), "Eix+aP0i");
        assert_eq!(full(Algorithm::HmacMd4, 8), "NpAO`]bE");
        assert_eq!(full(Algorithm::Rmd160, 32), "C:^4](#<%[H7\".m/A81v!LWkKCz^T#0L");
        assert_eq!(full(Algorithm::HmacRmd160, 32), "CLAQluuvHQm=l%u#UwH70&f5\"B.(AD`'");
    }

    #[test]
    fn test_regression_hex_charset() {
        let password = derive(
            Algorithm::HmacSha256,
            "hunter2",
            "github.comalice",
            20,
            "0123456789abcdef",
            "",
            "",
        )
        .unwrap();
        assert_eq!(*password, "8ebfae3461e809f61984");
    }

    #[test]
    fn test_regression_binary_charset() {
        let password = derive(Algorithm::Sha1, "master", "site.orgbob1", 100, "01", "", "").unwrap();
        assert_eq!(
            *password,
            "1000100110110000001010011000100110111001001000011101001100111100000111001011101101000111011000010111"
        );
    }

    #[test]
    fn test_regression_unicode_inputs() {
        let password = derive(
            Algorithm::Md5,
            "pässwörd",
            "exämple.org",
            16,
            "αβγδεζηθικλμνξοπρστυφχψω",
            "",
            "",
        )
        .unwrap();
        assert_eq!(*password, "ζκτλφεελγεμσυααδ");
        assert_eq!(password.chars().count(), 16);
    }

    #[test]
    fn test_deterministic() {
        for alg in available_algorithms() {
            assert_eq!(full(*alg, 24), full(*alg, 24));
        }
    }

    #[test]
    fn test_exact_length() {
        for length in [1, 2, 7, 8, 15, 16, 33, 64, 128] {
            for alg in available_algorithms() {
                let password = full(*alg, length);
                assert_eq!(password.chars().count(), length, "{} at {}", alg, length);
            }
        }
    }

    #[test]
    fn test_charset_closure() {
        let alphabet = "abc123";
        for alg in available_algorithms() {
            let password = derive(*alg, "secret", "example.org", 40, alphabet, "", "").unwrap();
            assert!(password.chars().all(|c| alphabet.contains(c)));
        }
    }

    #[test]
    fn test_short_charset_rejected() {
        for alphabet in ["", "x"] {
            let err = derive(Algorithm::Md5, "test", "example.com", 8, alphabet, "", "")
                .unwrap_err();
            assert!(matches!(err, PwmError::Validation(_)));
            assert!(err.to_string().contains("less than 2 characters"));
        }
    }

    #[test]
    fn test_zero_length_rejected() {
        let err = derive(Algorithm::Md5, "test", "example.com", 0, FULL_CHARSET, "", "")
            .unwrap_err();
        assert!(matches!(err, PwmError::Validation(_)));
    }

    #[test]
    fn test_iteration_budget_exhausted() {
        // md5 in base 94 yields about 20 characters per round
        let err = derive(Algorithm::Md5, "test", "example.com", 100_000, FULL_CHARSET, "", "")
            .unwrap_err();
        match err {
            PwmError::IterationBudgetExhausted { produced, required } => {
                assert!(produced < required);
                assert_eq!(required, 100_000);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(not(feature = "legacy"))]
    #[test]
    fn test_unavailable_algorithm_rejected() {
        let err = derive(Algorithm::HmacRmd160, "test", "example.com", 8, FULL_CHARSET, "", "")
            .unwrap_err();
        match err {
            PwmError::UnsupportedAlgorithm { name, valid } => {
                assert_eq!(name, "hmac-rmd160");
                assert_eq!(valid, "md5, hmac-md5, sha1, hmac-sha1, sha256, hmac-sha256");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_prefix() {
        let password = derive(Algorithm::Md5, "test", "example.com", 12, FULL_CHARSET, "pre", "")
            .unwrap();
        assert_eq!(*password, "preE+\"mh2+-7");
    }

    #[test]
    fn test_suffix() {
        let password = derive(Algorithm::Md5, "test", "example.com", 12, FULL_CHARSET, "", "!!")
            .unwrap();
        assert_eq!(*password, "E+\"mh2+-7l!!");
    }

    #[test]
    fn test_prefix_and_suffix() {
        let password = derive(Algorithm::Md5, "test", "example.com", 12, FULL_CHARSET, "ab", "YZ")
            .unwrap();
        assert_eq!(*password, "abE+\"mh2+-YZ");
    }

    #[test]
    fn test_suffix_fills_output() {
        let password = derive(Algorithm::Md5, "test", "example.com", 4, FULL_CHARSET, "", "WXYZ")
            .unwrap();
        assert_eq!(*password, "WXYZ");

        let password = derive(Algorithm::Md5, "test", "example.com", 3, FULL_CHARSET, "", "WXYZ")
            .unwrap();
        assert_eq!(*password, "WXY");
    }

    #[test]
    fn test_prefix_longer_than_length() {
        let password = derive(Algorithm::Md5, "test", "example.com", 4, FULL_CHARSET, "prefix", "")
            .unwrap();
        assert_eq!(*password, "pref");
    }

    #[test]
    fn test_multibyte_suffix() {
        let password = derive(Algorithm::Md5, "test", "example.com", 8, FULL_CHARSET, "", "üñ")
            .unwrap();
        assert_eq!(password.chars().count(), 8);
        assert!(password.ends_with("üñ"));
    }

    #[test]
    fn test_different_algorithms_differ() {
        let outputs: HashSet<String> = available_algorithms()
            .iter()
            .map(|alg| full(*alg, 16))
            .collect();
        assert_eq!(outputs.len(), available_algorithms().len());
    }

    #[test]
    fn test_context_changes_output() {
        let a = derive(Algorithm::HmacSha256, "test", "example.com", 16, FULL_CHARSET, "", "")
            .unwrap();
        let b = derive(Algorithm::HmacSha256, "test", "example.org", 16, FULL_CHARSET, "", "")
            .unwrap();
        assert_ne!(*a, *b);
    }

    #[test]
    fn test_iteration_key() {
        assert_eq!(*iteration_key(b"pw", 0), b"pw".to_vec());
        assert_eq!(*iteration_key(b"pw", 1), b"pw\n1".to_vec());
        assert_eq!(*iteration_key(b"pw", 42), b"pw\n42".to_vec());
    }

    #[test]
    fn test_request_debug_redacts_secret() {
        let request = DerivationRequest {
            algorithm: Algorithm::Md5,
            master_secret: Zeroizing::new("hunter2".to_string()),
            context: "example.com".to_string(),
            length: 8,
            alphabet: FULL_CHARSET.to_string(),
            prefix: String::new(),
            suffix: String::new(),
        };
        let debug = format!("{:?}", request);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
