/// Encodes `input` as a big-endian number in base `alphabet.len()`, without
/// leading zero digits.
///
/// The number is held as 16-bit big-endian words and repeatedly long-divided
/// by the alphabet size; each remainder is one output digit. Callers must pass
/// an alphabet of at least two characters.
pub fn encode(input: &[u8], alphabet: &[char]) -> String {
    debug_assert!(alphabet.len() >= 2, "alphabet must hold at least 2 characters");

    let divisor = alphabet.len() as u64;
    let mut dividend = to_words(input);
    let mut remainders = Vec::with_capacity(input.len() * 8);

    while !dividend.is_empty() {
        let mut quotient = Vec::with_capacity(dividend.len());
        let mut x: u64 = 0;

        for &word in &dividend {
            x = (x << 16) + u64::from(word);
            let q = x / divisor;
            x -= q * divisor;
            if !quotient.is_empty() || q > 0 {
                // x < divisor << 16 before the division, so q fits in a word
                quotient.push(q as u16);
            }
        }

        remainders.push(x as usize);
        dividend = quotient;
    }

    remainders.iter().rev().map(|&r| alphabet[r]).collect()
}

fn to_words(input: &[u8]) -> Vec<u16> {
    let padded;
    let bytes = if input.len() % 2 == 1 {
        padded = [&[0u8][..], input].concat();
        &padded[..]
    } else {
        input
    };

    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}
