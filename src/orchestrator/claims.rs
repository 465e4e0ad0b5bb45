use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::hashing::claim_fingerprint;
use crate::model::Claim;
use crate::provider::ExtractedClaim;

/// Gives decomposed claims their identity, in decomposition order.
///
/// Claims whose normalized text repeats an earlier claim are kept and point at the first
/// occurrence through `duplicate_of`.
pub fn build_claims(video_id: &str, extracted: Vec<ExtractedClaim>) -> Vec<Claim> {
    let mut first_seen: HashMap<String, String> = HashMap::new();

    extracted
        .into_iter()
        .enumerate()
        .map(|(position, extracted)| {
            let id = Claim::make_id(video_id, position);
            let fingerprint = claim_fingerprint(&extracted.text);
            let duplicate_of = match first_seen.entry(fingerprint.clone()) {
                Entry::Occupied(first) => Some(first.get().clone()),
                Entry::Vacant(slot) => {
                    slot.insert(id.clone());
                    None
                }
            };

            Claim {
                id,
                video_id: video_id.to_string(),
                position,
                text: extracted.text,
                claim_type: extracted.claim_type,
                confidence: extracted.confidence.clamp(0.0, 1.0),
                fingerprint,
                duplicate_of,
            }
        })
        .collect()
}
