//! Owner aggregation
//!
//! Groups fetched items per owner. Deterministic for a given input order:
//! owners keep first-seen order until the stable sort by holding size.

use super::{CollectionError, DerivedToken, ItemEntry, OwnerRecord};
use crate::address::is_contract_address;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    /// Drop owners whose address is a smart contract
    pub exclude_contracts: bool,
    /// Keep only owners holding at least one of these metadata file names
    pub metadata_allowlist: Vec<String>,
}

/// Splits a comma separated allowlist, trimming and dropping empty names
pub fn parse_allowlist(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn aggregate_owners(
    entries: Vec<ItemEntry>,
    options: &AggregateOptions,
) -> Result<Vec<OwnerRecord>, CollectionError> {
    let before = entries.len();
    let entries: Vec<ItemEntry> = if options.exclude_contracts {
        entries
            .into_iter()
            .filter(|entry| !is_contract_address(&entry.owner))
            .collect()
    } else {
        entries
    };
    if entries.len() != before {
        debug!("Excluded {} items held by contracts", before - entries.len());
    }

    if entries.is_empty() {
        return Err(CollectionError::NoOwners);
    }

    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<DerivedToken>> = HashMap::new();
    for entry in entries {
        let tokens = grouped.entry(entry.owner.clone()).or_insert_with(|| {
            order.push(entry.owner.clone());
            Vec::new()
        });
        tokens.push(DerivedToken {
            identifier: entry.identifier,
            metadata_file_name: entry.metadata_file_name,
        });
    }

    let mut records: Vec<OwnerRecord> = order
        .into_iter()
        .map(|owner| {
            let tokens = grouped.remove(&owner).unwrap_or_default();
            OwnerRecord::new(owner, tokens)
        })
        .collect();

    // `sort_by` is stable: equal counts keep first-seen order
    records.sort_by(|a, b| b.tokens_count.cmp(&a.tokens_count));

    if !options.metadata_allowlist.is_empty() {
        records.retain(|record| {
            record.tokens.iter().any(|token| {
                options
                    .metadata_allowlist
                    .iter()
                    .any(|name| *name == token.metadata_file_name)
            })
        });
        debug!(
            "{} owners hold an allowlisted metadata file",
            records.len()
        );
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = "erd1qqqqqqqqqqqqqpgquzu6s7vlxfzn53uvjy303wpuae5wzmd33aysqez3e2";

    fn entry(owner: &str, id: &str, file: &str) -> ItemEntry {
        ItemEntry {
            owner: owner.to_string(),
            identifier: id.to_string(),
            metadata_file_name: file.to_string(),
        }
    }

    #[test]
    fn test_dedupe_counts_and_order() {
        let entries = vec![
            entry("a", "C-01", "1"),
            entry("a", "C-02", "2"),
            entry("b", "C-03", "3"),
            entry("a", "C-04", "4"),
            entry("c", "C-05", "5"),
        ];

        let records = aggregate_owners(entries, &AggregateOptions::default()).unwrap();

        let summary: Vec<(&str, u64)> = records
            .iter()
            .map(|r| (r.owner.as_str(), r.tokens_count))
            .collect();
        assert_eq!(summary, vec![("a", 3), ("b", 1), ("c", 1)]);
        assert_eq!(
            records[0]
                .tokens
                .iter()
                .map(|t| t.identifier.as_str())
                .collect::<Vec<_>>(),
            vec!["C-01", "C-02", "C-04"]
        );
        assert!(records.iter().all(|r| r.tokens_count as usize == r.tokens.len()));
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let entries = vec![
            entry("z", "C-01", ""),
            entry("y", "C-02", ""),
            entry("x", "C-03", ""),
            entry("x", "C-04", ""),
        ];
        let records = aggregate_owners(entries, &AggregateOptions::default()).unwrap();
        let owners: Vec<&str> = records.iter().map(|r| r.owner.as_str()).collect();
        assert_eq!(owners, vec!["x", "z", "y"]);
    }

    #[test]
    fn test_exclude_contracts() {
        let user = "erd1qyu5wthldzr8wx5c9ucg8kjagg0jfs53s8nr3zpz3hypefsdd8ssycr6th";
        let entries = vec![
            entry(CONTRACT, "C-01", ""),
            entry(CONTRACT, "C-02", ""),
            entry(user, "C-03", ""),
        ];
        let options = AggregateOptions {
            exclude_contracts: true,
            ..Default::default()
        };

        let records = aggregate_owners(entries.clone(), &options).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].owner, user);

        let all = aggregate_owners(entries, &AggregateOptions::default()).unwrap();
        assert_eq!(all[0].owner, CONTRACT);
    }

    #[test]
    fn test_only_contracts_is_no_owners() {
        let options = AggregateOptions {
            exclude_contracts: true,
            ..Default::default()
        };
        let result = aggregate_owners(vec![entry(CONTRACT, "C-01", "")], &options);
        assert!(matches!(result, Err(CollectionError::NoOwners)));
        assert!(matches!(
            aggregate_owners(Vec::new(), &AggregateOptions::default()),
            Err(CollectionError::NoOwners)
        ));
    }

    #[test]
    fn test_metadata_allowlist_is_or_across_names_and_tokens() {
        let entries = vec![
            entry("a", "C-01", "1"),
            entry("a", "C-02", "9"),
            entry("b", "C-03", "2"),
            entry("c", "C-04", "3"),
            entry("c", "C-05", "4"),
        ];
        let options = AggregateOptions {
            metadata_allowlist: parse_allowlist(" 9, 3 ,,"),
            ..Default::default()
        };

        let records = aggregate_owners(entries, &options).unwrap();
        let owners: Vec<&str> = records.iter().map(|r| r.owner.as_str()).collect();
        assert_eq!(owners, vec!["a", "c"]);
        // Filtering keeps the full holding, not just the matching tokens
        assert_eq!(records[1].tokens_count, 2);
    }

    #[test]
    fn test_parse_allowlist() {
        assert_eq!(parse_allowlist("1,2, 3"), vec!["1", "2", "3"]);
        assert!(parse_allowlist("  ").is_empty());
    }
}
