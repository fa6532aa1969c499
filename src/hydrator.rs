//! The hydrator (`spec.md` §4.5): materializes full scene records in the
//! order fusion produced, attaching fused score and debug attribution.

use std::collections::HashMap;
use std::sync::Arc;

use crate::candidate::FusedCandidate;
use crate::collaborators::SceneStore;
use crate::error::Result;
use crate::response::ResultItem;

/// Batch-fetch scene records for `fused` (already limited to at most the
/// requested page size) and zip them back onto the fusion output,
/// preserving fusion order. Ids missing from the scene store (deleted
/// between fusion and hydration) are silently dropped, so the output may
/// be shorter than `fused`.
pub async fn hydrate(
    scene_store: &Arc<dyn SceneStore>,
    fused: Vec<FusedCandidate>,
) -> Result<Vec<ResultItem>> {
    let ids: Vec<String> = fused.iter().map(|f| f.scene_id.clone()).collect();
    let records = scene_store.get_many_preserve_order(&ids).await?;
    let mut by_id: HashMap<String, serde_json::Value> = records
        .into_iter()
        .map(|r| (r.scene_id, r.fields))
        .collect();

    Ok(fused
        .into_iter()
        .filter_map(|candidate| {
            let fields = by_id.remove(&candidate.scene_id)?;
            Some(ResultItem {
                scene_id: candidate.scene_id,
                fused_score: candidate.fused_score,
                score_type: candidate.score_type,
                debug: candidate.debug,
                fields,
            })
        })
        .collect())
}
