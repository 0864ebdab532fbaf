const MAX_ALIAS_BASE: usize = 10;

/// Column alias built from a column name and its table-wide unique index:
/// lower-cased, trailing non-letters dropped, truncated, then `{index}_`.
pub fn column_alias(column: &str, unique_index: usize) -> String {
    let lowered = column.to_lowercase();
    let base = match lowered.rfind(|c: char| c.is_alphabetic()) {
        None => "column".to_string(),
        Some(last_letter) => {
            let end = last_letter + lowered[last_letter..].chars().next().map_or(1, char::len_utf8);
            lowered[..end].to_string()
        }
    };
    let base: String = base.chars().take(MAX_ALIAS_BASE).collect();
    format!("{}{}_", base, unique_index)
}

/// `alias.column as column_alias` entries joined with commas.
pub fn select_fragment_of(table_alias: &str, columns: &[String], aliases: &[String]) -> String {
    columns
        .iter()
        .zip(aliases)
        .map(|(column, alias)| format!("{}.{} as {}", table_alias, column, alias))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use crate::metamodel::{column_alias, select_fragment_of};

    #[test]
    pub fn test_column_alias() {
        assert_eq!(column_alias("ID", 0), "id0_");
        assert_eq!(column_alias("first_name", 3), "first_name3_");
        assert_eq!(column_alias("description_text", 12), "descriptio12_");
        assert_eq!(column_alias("line2", 1), "line1_");
        assert_eq!(column_alias("42", 5), "column5_");
    }

    #[test]
    pub fn test_select_fragment() {
        let fragment = select_fragment_of(
            "p",
            &["id".to_string(), "name".to_string()],
            &["id0_a_".to_string(), "name1_a_".to_string()],
        );

        assert_eq!(fragment, "p.id as id0_a_, p.name as name1_a_");
    }
}
