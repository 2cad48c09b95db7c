//! Candidate selection: bounded, deterministically ordered pools with a
//! fixed constraint-relaxation ladder for over-constrained hints.

use std::collections::HashSet;

use crate::{Hints, Mountain, Preferences, Season};

/// Default number of candidates handed to the model per turn.
pub const DEFAULT_POOL_LIMIT: usize = 20;
/// Hard upper bound on the candidate pool size.
pub const MAX_POOL_LIMIT: usize = 50;
/// Winter hint drops anything higher than this (alpine hazard proxy).
const WINTER_ELEVATION_CEILING_M: i32 = 2500;

/// Prefectures within roughly a three-hour drive of Shinjuku.
const NEAR_TOKYO_PREFECTURES: [&str; 10] = [
    "東京", "神奈川", "埼玉", "千葉", "山梨", "静岡", "群馬", "栃木", "茨城", "長野",
];

/// Prefectures within roughly two hours of Shin-Osaka by shinkansen.
const NEAR_OSAKA_PREFECTURES: [&str; 12] = [
    "大阪", "兵庫", "京都", "奈良", "滋賀", "和歌山", "三重", "岐阜", "愛知", "静岡",
    "岡山", "広島",
];

/// Split a raw prefecture cell on the delimiters the dataset uses and
/// strip the 都/道/府/県 administrative suffix from each token.
fn prefecture_tokens(raw: &str) -> Vec<String> {
    raw.split(['・', '／', '/', '、', ','])
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let bare = part
                .strip_suffix('都')
                .or_else(|| part.strip_suffix('道'))
                .or_else(|| part.strip_suffix('府'))
                .or_else(|| part.strip_suffix('県'))
                .unwrap_or(part);
            if bare.is_empty() {
                None
            } else {
                Some(bare.to_string())
            }
        })
        .collect()
}

fn filter_by_prefectures(rows: &[Mountain], allowed: &[&str]) -> Vec<Mountain> {
    let allowed: HashSet<&str> = allowed.iter().copied().collect();
    rows.iter()
        .filter(|m| {
            m.prefecture.as_deref().is_some_and(|p| {
                prefecture_tokens(p)
                    .iter()
                    .any(|t| allowed.contains(t.as_str()))
            })
        })
        .cloned()
        .collect()
}

fn filter_by_regions(rows: &[Mountain], regions: &[String]) -> Vec<Mountain> {
    rows.iter()
        .filter(|m| regions.iter().any(|r| r == &m.region))
        .cloned()
        .collect()
}

fn filter_by_difficulty(rows: &[Mountain], stars: &[String]) -> Vec<Mountain> {
    rows.iter()
        .filter(|m| {
            m.difficulty
                .as_deref()
                .is_some_and(|d| stars.iter().any(|s| s == d))
        })
        .cloned()
        .collect()
}

/// 32-bit running hash over UTF-16 code units (`h = (h << 5) - h + unit`,
/// wrapping). Order-dependent, so the same seed text always lands on the
/// same rotation offset.
pub fn seed_hash(seed: &str) -> i32 {
    let mut h: i32 = 0;
    for unit in seed.encode_utf16() {
        h = h.wrapping_shl(5).wrapping_sub(h).wrapping_add(unit as i32);
    }
    h
}

/// Build the candidate pool for one chat turn.
///
/// Stages, in order: completed-id exclusion, hard preference filters,
/// proximity hints, winter elevation ceiling, difficulty hint, region
/// hint. If the hints jointly empty the pool, constraints degrade in a
/// fixed order (difficulty, then season, then proximity, then the base
/// pool) with a region hint re-applied at every step so region is the
/// last constraint ever dropped. Never errors; an empty result is only
/// possible when the region hint has zero matches in the base data.
pub fn select_candidates(
    rows: &[Mountain],
    completed: &[String],
    prefs: Option<&Preferences>,
    limit: usize,
    seed: &str,
    hints: &Hints,
) -> Vec<Mountain> {
    let completed: HashSet<&str> = completed.iter().map(String::as_str).collect();
    let mut pool: Vec<Mountain> = rows
        .iter()
        .filter(|m| !completed.contains(m.id.as_str()))
        .cloned()
        .collect();

    // Explicit preferences are hard filters, never relaxed.
    if let Some(prefs) = prefs {
        if let Some(regions) = prefs.regions.as_deref() {
            if !regions.is_empty() {
                pool = filter_by_regions(&pool, regions);
            }
        }
        if let Some(stars) = prefs.difficulty.as_deref() {
            if !stars.is_empty() {
                pool = filter_by_difficulty(&pool, stars);
            }
        }
    }

    // Snapshots taken at each heuristic stage feed the relaxation ladder.
    let base = pool.clone();

    let mut after_geo = pool.clone();
    if hints.near_tokyo {
        let filtered = filter_by_prefectures(&pool, &NEAR_TOKYO_PREFECTURES);
        if !filtered.is_empty() {
            after_geo = filtered;
        }
        pool = after_geo.clone();
    }
    if hints.near_osaka {
        let filtered = filter_by_prefectures(&pool, &NEAR_OSAKA_PREFECTURES);
        if !filtered.is_empty() {
            after_geo = filtered;
        }
        pool = after_geo.clone();
    }

    let mut after_season = pool.clone();
    if hints.season == Some(Season::Winter) {
        after_season = pool
            .iter()
            .filter(|m| m.elevation_m.is_none_or(|e| e <= WINTER_ELEVATION_CEILING_M))
            .cloned()
            .collect();
        pool = after_season.clone();
    }

    if let Some(stars) = hints.difficulty_stars.as_deref() {
        if !stars.is_empty() {
            pool = filter_by_difficulty(&pool, stars);
        }
    }

    let region_hint = hints.regions.as_deref().filter(|r| !r.is_empty());
    if let Some(regions) = region_hint {
        pool = filter_by_regions(&pool, regions);
    }

    if pool.is_empty() {
        pool = match region_hint {
            // Region stays strict: retry each earlier snapshot under the
            // region filter. The result may legitimately remain empty.
            Some(regions) => {
                let drop_difficulty = filter_by_regions(&after_season, regions);
                if !drop_difficulty.is_empty() {
                    drop_difficulty
                } else {
                    let drop_season = filter_by_regions(&after_geo, regions);
                    if !drop_season.is_empty() {
                        drop_season
                    } else {
                        filter_by_regions(&base, regions)
                    }
                }
            }
            None => {
                if !after_season.is_empty() {
                    after_season
                } else if !after_geo.is_empty() {
                    after_geo
                } else {
                    base
                }
            }
        };
    }

    // Deterministic windowing: rotate by the seed hash, then cap.
    let cap = limit.clamp(1, MAX_POOL_LIMIT);
    if pool.len() <= cap {
        return pool;
    }
    if !seed.is_empty() {
        let offset = seed_hash(seed).unsigned_abs() as usize % pool.len();
        pool.rotate_left(offset);
    }
    pool.truncate(cap);
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mountain(
        id: &str,
        region: &str,
        prefecture: Option<&str>,
        difficulty: Option<&str>,
        elevation_m: Option<i32>,
    ) -> Mountain {
        Mountain {
            id: id.to_string(),
            name_en: format!("Mount {id}"),
            name_ja: format!("{id}山"),
            name_zh: format!("{id}山"),
            region: region.to_string(),
            prefecture: prefecture.map(str::to_string),
            difficulty: difficulty.map(str::to_string),
            elevation_m,
        }
    }

    fn dataset() -> Vec<Mountain> {
        vec![
            mountain("m01", "関東", Some("東京都"), Some("★"), Some(599)),
            mountain("m02", "関東", Some("栃木県"), Some("★★"), Some(2486)),
            mountain("m03", "中部", Some("山梨県・静岡県"), Some("★★★"), Some(3776)),
            mountain("m04", "中部", Some("長野県"), Some("★★★★"), Some(2956)),
            mountain("m05", "北海道", Some("北海道"), Some("★★★"), Some(2291)),
            mountain("m06", "関西", Some("奈良県"), Some("★"), Some(1719)),
            mountain("m07", "九州", Some("鹿児島県"), Some("★★"), Some(1936)),
            mountain("m08", "東北", Some("山形県"), Some("★★"), Some(1984)),
        ]
    }

    fn ids(pool: &[Mountain]) -> Vec<&str> {
        pool.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn unconstrained_pool_is_min_of_cap_and_dataset() {
        let rows = dataset();
        let pool = select_candidates(&rows, &[], None, 20, "", &Hints::default());
        assert_eq!(pool.len(), rows.len());
        let pool = select_candidates(&rows, &[], None, 3, "", &Hints::default());
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn completed_ids_never_reappear() {
        let rows = dataset();
        let completed = vec!["m01".to_string(), "m05".to_string()];
        let pool = select_candidates(&rows, &completed, None, 50, "seed", &Hints::default());
        assert!(!ids(&pool).contains(&"m01"));
        assert!(!ids(&pool).contains(&"m05"));
        assert_eq!(pool.len(), rows.len() - 2);
    }

    #[test]
    fn explicit_preferences_are_hard_filters() {
        let rows = dataset();
        let prefs = Preferences {
            regions: Some(vec!["中部".to_string()]),
            difficulty: Some(vec!["★★★".to_string()]),
            season: None,
        };
        let pool = select_candidates(&rows, &[], Some(&prefs), 20, "", &Hints::default());
        assert_eq!(ids(&pool), vec!["m03"]);

        // An impossible preference combination is never relaxed.
        let prefs = Preferences {
            regions: Some(vec!["九州".to_string()]),
            difficulty: Some(vec!["★★★★★".to_string()]),
            season: None,
        };
        let pool = select_candidates(&rows, &[], Some(&prefs), 20, "", &Hints::default());
        assert!(pool.is_empty());
    }

    #[test]
    fn winter_hint_drops_high_elevation() {
        let rows = dataset();
        let hints = Hints {
            season: Some(Season::Winter),
            ..Hints::default()
        };
        let pool = select_candidates(&rows, &[], None, 50, "", &hints);
        assert!(pool.iter().all(|m| m.elevation_m.unwrap() <= 2500));
        assert!(!ids(&pool).contains(&"m03"));
        assert!(!ids(&pool).contains(&"m04"));
    }

    #[test]
    fn winter_keeps_rows_with_unknown_elevation() {
        let rows = vec![mountain("mx", "関東", Some("東京都"), Some("★"), None)];
        let hints = Hints {
            season: Some(Season::Winter),
            ..Hints::default()
        };
        let pool = select_candidates(&rows, &[], None, 50, "", &hints);
        assert_eq!(ids(&pool), vec!["mx"]);
    }

    #[test]
    fn tokyo_proximity_filters_by_prefecture_tokens() {
        let rows = dataset();
        let hints = Hints {
            near_tokyo: true,
            ..Hints::default()
        };
        let pool = select_candidates(&rows, &[], None, 50, "", &hints);
        // m03 qualifies through the 山梨県・静岡県 multi-value cell.
        assert_eq!(ids(&pool), vec!["m01", "m02", "m03", "m04"]);
    }

    #[test]
    fn proximity_falls_back_when_it_empties_the_pool() {
        // Nothing near Tokyo in this slice; the pre-proximity pool wins.
        let rows = vec![
            mountain("k1", "九州", Some("鹿児島県"), Some("★★"), Some(1936)),
            mountain("k2", "九州", Some("大分県"), Some("★★"), Some(1791)),
        ];
        let hints = Hints {
            near_tokyo: true,
            ..Hints::default()
        };
        let pool = select_candidates(&rows, &[], None, 50, "", &hints);
        assert_eq!(pool.len(), 2);

        let hints = Hints {
            near_osaka: true,
            ..Hints::default()
        };
        let pool = select_candidates(&rows, &[], None, 50, "", &hints);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn relaxation_drops_difficulty_first() {
        let rows = dataset();
        // Winter leaves low mountains, but no ★★★★★ exists anywhere:
        // the difficulty hint empties the pool and is dropped first,
        // leaving the season-stage pool intact.
        let hints = Hints {
            season: Some(Season::Winter),
            difficulty_stars: Some(vec!["★★★★★".to_string()]),
            ..Hints::default()
        };
        let pool = select_candidates(&rows, &[], None, 50, "", &hints);
        assert!(!pool.is_empty());
        assert!(pool.iter().all(|m| m.elevation_m.unwrap() <= 2500));
    }

    #[test]
    fn region_hint_survives_full_relaxation() {
        let rows = dataset();
        // 中部 only has 3000m-class peaks here, so winter + 中部 is
        // impossible until season is dropped; region must still hold.
        let hints = Hints {
            season: Some(Season::Winter),
            regions: Some(vec!["中部".to_string()]),
            ..Hints::default()
        };
        let pool = select_candidates(&rows, &[], None, 50, "", &hints);
        assert!(!pool.is_empty());
        assert!(pool.iter().all(|m| m.region == "中部"));
    }

    #[test]
    fn region_hint_with_no_base_matches_yields_empty() {
        let rows = dataset();
        let hints = Hints {
            regions: Some(vec!["四国".to_string()]),
            ..Hints::default()
        };
        let pool = select_candidates(&rows, &[], None, 50, "", &hints);
        assert!(pool.is_empty());
    }

    #[test]
    fn selection_is_deterministic() {
        let rows = dataset();
        let hints = Hints::default();
        let a = select_candidates(&rows, &[], None, 4, "an easy day hike", &hints);
        let b = select_candidates(&rows, &[], None, 4, "an easy day hike", &hints);
        assert_eq!(a, b);
    }

    #[test]
    fn rotation_is_a_contiguous_window() {
        let rows = dataset();
        let seed = "show me something new";
        let cap = 3;
        let pool = select_candidates(&rows, &[], None, cap, seed, &Hints::default());
        assert_eq!(pool.len(), cap);
        let offset = seed_hash(seed).unsigned_abs() as usize % rows.len();
        let expected: Vec<&str> = rows
            .iter()
            .cycle()
            .skip(offset)
            .take(cap)
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids(&pool), expected);
    }

    #[test]
    fn empty_seed_takes_a_stable_prefix() {
        let rows = dataset();
        let pool = select_candidates(&rows, &[], None, 2, "", &Hints::default());
        assert_eq!(ids(&pool), vec!["m01", "m02"]);
    }

    #[test]
    fn limit_is_clamped() {
        let rows = dataset();
        let pool = select_candidates(&rows, &[], None, 0, "", &Hints::default());
        assert_eq!(pool.len(), 1);
        let pool = select_candidates(&rows, &[], None, 9999, "", &Hints::default());
        assert_eq!(pool.len(), rows.len());
    }

    #[test]
    fn prefecture_tokens_strip_suffixes_and_split() {
        assert_eq!(prefecture_tokens("東京都"), vec!["東京"]);
        assert_eq!(prefecture_tokens("山梨県・静岡県"), vec!["山梨", "静岡"]);
        assert_eq!(prefecture_tokens("北海道"), vec!["北海"]);
        assert_eq!(prefecture_tokens("大阪府／奈良県"), vec!["大阪", "奈良"]);
        assert!(prefecture_tokens("  ").is_empty());
    }

    #[test]
    fn seed_hash_matches_known_values() {
        // Spot checks against the 32-bit (h << 5) - h + unit recurrence.
        assert_eq!(seed_hash(""), 0);
        assert_eq!(seed_hash("a"), 97);
        assert_eq!(seed_hash("ab"), 97 * 31 + 98);
    }
}
