//! Display ordering, rating buckets and per-category breakdowns.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{EntityKind, RatingSet};
use super::rating::round2;

/// Review fields needed to order a review list.
pub trait Rankable {
    fn helpful_count(&self) -> i32;
    fn not_helpful_count(&self) -> i32;
    fn created_at(&self) -> DateTime<FixedOffset>;

    fn net_helpfulness(&self) -> i64 {
        i64::from(self.helpful_count()) - i64::from(self.not_helpful_count())
    }
}

/// Net helpfulness descending, newest first among ties.
pub fn compare_for_display<T: Rankable>(a: &T, b: &T) -> Ordering {
    b.net_helpfulness()
        .cmp(&a.net_helpfulness())
        .then_with(|| b.created_at().cmp(&a.created_at()))
}

pub fn sort_for_display<T: Rankable>(reviews: &mut [T]) {
    reviews.sort_by(compare_for_display);
}

/// Star bucket (1..=5) an average falls into; halves round up.
pub fn rating_bucket(average: f64) -> u8 {
    average.round().clamp(1.0, 5.0) as u8
}

/// Mean score of one category across a set of reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryScore {
    pub category: String,
    pub average: f64,
    pub count: usize,
}

/// Per-category means for the breakdown bars, in category order.
pub fn category_breakdown<'a, I>(kind: EntityKind, sets: I) -> Vec<CategoryScore>
where
    I: IntoIterator<Item = &'a RatingSet>,
{
    let categories = kind.categories();
    let mut totals = vec![0u32; categories.len()];
    let mut count = 0usize;

    for set in sets.into_iter().filter(|set| set.kind() == kind) {
        for (slot, (_, score)) in totals.iter_mut().zip(set.iter()) {
            *slot += u32::from(score);
        }
        count += 1;
    }

    categories
        .iter()
        .zip(totals)
        .map(|(category, total)| CategoryScore {
            category: category.to_string(),
            average: if count == 0 {
                0.0
            } else {
                round2(f64::from(total) / count as f64)
            },
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone)]
    struct Row {
        label: &'static str,
        helpful: i32,
        not_helpful: i32,
        minute: u32,
    }

    impl Rankable for Row {
        fn helpful_count(&self) -> i32 {
            self.helpful
        }
        fn not_helpful_count(&self) -> i32 {
            self.not_helpful
        }
        fn created_at(&self) -> DateTime<FixedOffset> {
            FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2025, 3, 1, 12, self.minute, 0)
                .unwrap()
        }
    }

    fn row(label: &'static str, helpful: i32, not_helpful: i32, minute: u32) -> Row {
        Row {
            label,
            helpful,
            not_helpful,
            minute,
        }
    }

    #[test]
    fn net_helpfulness_then_recency() {
        let mut rows = vec![
            row("old-neutral", 0, 0, 1),
            row("popular", 10, 2, 2),
            row("new-neutral", 3, 3, 30),
            row("disliked", 0, 4, 59),
        ];
        sort_for_display(&mut rows);

        let order: Vec<_> = rows.iter().map(|r| r.label).collect();
        assert_eq!(order, ["popular", "new-neutral", "old-neutral", "disliked"]);
    }

    #[test]
    fn buckets_round_half_up() {
        assert_eq!(rating_bucket(1.0), 1);
        assert_eq!(rating_bucket(2.49), 2);
        assert_eq!(rating_bucket(2.5), 3);
        assert_eq!(rating_bucket(4.83), 5);
        assert_eq!(rating_bucket(0.0), 1);
    }

    #[test]
    fn breakdown_averages_each_category() {
        let make = |scores: [i64; 5]| {
            let raw: BTreeMap<String, i64> = EntityKind::Landlord
                .categories()
                .iter()
                .zip(scores)
                .map(|(name, score)| (name.to_string(), score))
                .collect();
            RatingSet::new(EntityKind::Landlord, &raw).unwrap()
        };
        let sets = [make([5, 4, 3, 2, 1]), make([4, 4, 4, 4, 4])];

        let breakdown = category_breakdown(EntityKind::Landlord, &sets);

        assert_eq!(breakdown.len(), 5);
        assert_eq!(breakdown[0].category, "responsiveness");
        assert_eq!(breakdown[0].average, 4.5);
        assert_eq!(breakdown[4].average, 2.5);
        assert!(breakdown.iter().all(|entry| entry.count == 2));
    }

    #[test]
    fn empty_breakdown_lists_categories_with_zero() {
        let breakdown = category_breakdown(EntityKind::Neighborhood, &Vec::<RatingSet>::new());
        assert_eq!(breakdown.len(), 6);
        assert!(breakdown.iter().all(|entry| entry.average == 0.0 && entry.count == 0));
    }
}
