//! Macro compression of move strings.
//!
//! An encoded string reads `main;macro1;macro2;...`. Digit `k` in the main
//! part stands for the `k`-th macro, and macros only contain moves.

use anyhow::{bail, ensure, Context, Result};
use arrayvec::ArrayVec;
use rayon::prelude::*;

use crate::Direction;

type IndexMap<K, V> = indexmap::IndexMap<K, V, fxhash::FxBuildHasher>;

/// Macros are referenced by a single digit `1..=8`.
pub const MAX_MACROS: usize = 8;
const MAX_MACRO_LEN: usize = 9;
// Candidates tried at each level.
const BRANCHING: usize = 3;

type Macros = ArrayVec<String, MAX_MACROS>;

pub fn encode(moves: &str) -> String {
    compress(moves, &Macros::new())
}

pub fn decode(encoded: &str) -> Result<String> {
    let mut parts = encoded.split(';');
    let main = parts.next().unwrap_or_default();
    let macros = parts.collect::<Vec<_>>();
    ensure!(
        macros.len() <= MAX_MACROS,
        "Too many macros: {}, at most {MAX_MACROS}",
        macros.len(),
    );

    let mut moves = String::new();
    for ch in main.chars() {
        match ch {
            '1'..='8' => {
                let idx = ch as usize - '1' as usize;
                let body = macros
                    .get(idx)
                    .with_context(|| format!("Undefined macro {ch}"))?;
                ensure!(
                    body.chars().all(|c| Direction::from_symbol(c).is_some()),
                    "Invalid body of macro {ch}: {body:?}",
                );
                moves.push_str(body);
            }
            _ if Direction::from_symbol(ch).is_some() => moves.push(ch),
            _ => bail!("Invalid symbol {ch:?}"),
        }
    }
    Ok(moves)
}

fn join(main: &str, macros: &Macros) -> String {
    std::iter::once(main)
        .chain(macros.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(";")
}

/// Move-only substrings of length `2..=MAX_MACRO_LEN`, counting overlapping
/// occurrences, in order of first appearance.
fn count_substrings(s: &str) -> IndexMap<&str, usize> {
    let bytes = s.as_bytes();
    let mut counts = IndexMap::default();
    for start in 0..bytes.len() {
        if !bytes[start].is_ascii_alphabetic() {
            continue;
        }
        for end in start + 2..=(start + MAX_MACRO_LEN).min(bytes.len()) {
            if !bytes[end - 1].is_ascii_alphabetic() {
                break;
            }
            *counts.entry(&s[start..end]).or_insert(0) += 1;
        }
    }
    counts
}

fn compress(s: &str, macros: &Macros) -> String {
    let best = join(s, macros);
    if macros.is_full() {
        return best;
    }

    // Characters saved: the occurrences collapse to one digit each, and the
    // macro costs its body plus a separator and a digit.
    let mut candidates = count_substrings(s)
        .into_iter()
        .map(|(sub, occurrences)| {
            let gain = (sub.len() + 2) as isize - (sub.len() * occurrences) as isize;
            (sub, gain)
        })
        .filter(|&(_, gain)| gain < 0)
        .collect::<Vec<_>>();
    candidates.sort_by_key(|&(_, gain)| gain);
    candidates.truncate(BRANCHING);

    let digit = char::from(b'1' + macros.len() as u8).to_string();
    let branch_best = candidates
        .par_iter()
        .map(|&(sub, _)| {
            let mut macros = macros.clone();
            macros.push(sub.to_owned());
            compress(&s.replace(sub, &digit), &macros)
        })
        .min_by_key(|out| out.len());

    match branch_best {
        Some(out) if out.len() < best.len() => out,
        _ => best,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        for moves in [
            "",
            "R",
            "RDURRRDURR",
            "UUUUDDDDUUUUDDDD",
            "DDDDRRDDDDDUUUUULLUUUULLLLUUDDRRRRDDDDRRDDDDDDDDDDDDLLUUUULLUUUUULURUULLLL",
        ] {
            let encoded = encode(moves);
            assert!(encoded.len() <= moves.len(), "{encoded:?}");
            assert_eq!(decode(&encoded).unwrap(), moves, "{encoded:?}");
            assert!(encoded.split(';').count() - 1 <= MAX_MACROS, "{encoded:?}");
        }
    }

    #[test]
    fn repeated_moves_shrink() {
        let moves = "UUUUDDDDUUUUDDDD";
        let encoded = encode(moves);
        assert!(encoded.len() < moves.len(), "{encoded:?}");
        assert!(encoded.contains(';'));
        assert_eq!(encode(moves), encoded);
    }

    #[test]
    fn short_moves_are_kept() {
        assert_eq!(encode(""), "");
        assert_eq!(encode("RDL"), "RDL");
    }

    #[test]
    fn decode_macros() {
        assert_eq!(decode("1R1;UD").unwrap(), "UDRUD");
        assert_eq!(decode("12;RR;LL").unwrap(), "RRLL");
        assert!(decode("R1").is_err());
        assert!(decode("RZ").is_err());
        assert!(decode("1;R2").is_err());
        assert!(decode("R;U;U;U;U;U;U;U;U;U;U").is_err());
    }

    #[test]
    fn at_most_eight_macros() {
        assert_eq!(decode("18;U;U;U;U;U;U;U;D").unwrap(), "UD");
        assert!(decode("1;U;U;U;U;U;U;U;U;U").is_err());
        assert!(decode("9;U;U;U;U;U;U;U;U").is_err());

        // More repeated patterns than digits available.
        let moves = ["RRDD", "LLUU", "RDRD", "ULUL", "DDRR", "UULL", "DRDR", "LULU", "RRUU", "DDLL"]
            .iter()
            .map(|pattern| pattern.repeat(3))
            .collect::<String>();
        let encoded = encode(&moves);
        assert!(encoded.split(';').count() - 1 <= MAX_MACROS, "{encoded:?}");
        assert_eq!(decode(&encoded).unwrap(), moves);
    }
}
