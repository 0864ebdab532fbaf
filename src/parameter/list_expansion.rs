use std::borrow::Cow;

use crate::parameter::{
    JdbcParameterBindings, ParameterBinding, ParameterMarkerStrategy, ParameterOccurrence, QueryParameterBindings,
    SqlBuffer,
};
use crate::{QueryError, Result};

/// Number of markers written for a multi-valued binding of `count` values.
///
/// With padding, lists of more than two values round up to the next power of
/// two, without crossing the dialect's IN limit (0 means no limit).
pub fn bind_value_max_count(padding_enabled: bool, in_expression_limit: usize, count: usize) -> usize {
    if !padding_enabled || count <= 2 {
        return count;
    }
    let mut padded = count.next_power_of_two();
    if in_expression_limit > 0 && padded > in_expression_limit {
        padded = in_expression_limit;
    }
    padded.max(count)
}

/// Rewrites parameter markers for multi-valued bindings and produces the
/// matching JDBC bindings. Both walk the occurrences in the same order.
#[derive(Debug)]
pub struct InListExpander<'a> {
    pub padding_enabled: bool,
    pub in_expression_limit: usize,
    pub dialect_name: &'a str,
    pub marker_strategy: &'a dyn ParameterMarkerStrategy,
    pub start_position: usize,
}

impl InListExpander<'_> {
    fn max_count(&self, count: usize) -> usize {
        bind_value_max_count(self.padding_enabled, self.in_expression_limit, count)
    }

    pub fn expand<'s>(
        &self,
        sql: &'s str,
        occurrences: &[ParameterOccurrence],
        bindings: &QueryParameterBindings,
    ) -> Cow<'s, str> {
        let position_sensitive = self.marker_strategy.is_position_sensitive();
        if occurrences.is_empty() || (!bindings.has_multi_valued() && !position_sensitive) {
            return Cow::Borrowed(sql);
        }

        let mut buffer = SqlBuffer::new(sql);
        let mut position = self.start_position;

        for occurrence in occurrences {
            let values = match bindings.get(&occurrence.parameter) {
                Some(ParameterBinding::Multi(values)) => values,
                _ => {
                    if position_sensitive {
                        let marker = self.marker_strategy.create_marker(position);
                        buffer.replace(occurrence.source_position, occurrence.length, &marker);
                    }
                    position += 1;
                    continue;
                }
            };

            let count = values.len();
            if self.in_expression_limit > 0 && count > self.in_expression_limit {
                tracing::warn!(
                    dialect = %self.dialect_name,
                    limit = self.in_expression_limit,
                    parameter = %occurrence.parameter.label(),
                    count,
                    "too many elements bound to an IN list; the dialect may reject the statement"
                );
            }

            let max_count = self.max_count(count);
            let enclosed = buffer.is_enclosed_in_parens(occurrence.source_position, occurrence.length);
            if count == 1 && enclosed && !position_sensitive {
                position += 1;
                continue;
            }

            let expansion = if max_count == 0 {
                if enclosed { "null".to_string() } else { "(null)".to_string() }
            } else {
                let markers = (0..max_count)
                    .map(|i| self.marker_strategy.create_marker(position + i))
                    .collect::<Vec<_>>()
                    .join(",");
                if enclosed { markers } else { format!("({})", markers) }
            };
            position += max_count;
            buffer.replace(occurrence.source_position, occurrence.length, &expansion);
        }

        Cow::Owned(buffer.into_string())
    }

    /// JDBC bindings for the expanded SQL; padded slots repeat the last value.
    pub fn bind(
        &self,
        occurrences: &[ParameterOccurrence],
        bindings: &QueryParameterBindings,
    ) -> Result<JdbcParameterBindings> {
        let mut jdbc = JdbcParameterBindings::none();
        let mut position = self.start_position;

        for occurrence in occurrences {
            match bindings.get(&occurrence.parameter) {
                None => {
                    return Err(QueryError::binding(format!(
                        "No value bound for parameter [{}]",
                        occurrence.parameter
                    )));
                }
                Some(ParameterBinding::Single(value)) => {
                    jdbc.push(position, value.clone());
                    position += 1;
                }
                Some(ParameterBinding::Multi(values)) => {
                    let Some(last) = values.last() else {
                        continue;
                    };
                    for i in 0..self.max_count(values.len()) {
                        jdbc.push(position, values.get(i).unwrap_or(last).clone());
                        position += 1;
                    }
                }
            }
        }

        Ok(jdbc)
    }
}

#[cfg(test)]
mod tests {
    use crate::_fixtures::fixtures::capture_logs;
    use crate::parameter::{
        bind_value_max_count, BindValue, InListExpander, OrdinalMarkerStrategy, ParameterBinding,
        ParameterInterpretation, ParameterMarkerStrategy, QueryParameter, QueryParameterBindings,
        StandardMarkerStrategy,
    };

    fn expander<'a>(padding: bool, limit: usize, marker: &'a dyn ParameterMarkerStrategy) -> InListExpander<'a> {
        InListExpander {
            padding_enabled: padding,
            in_expression_limit: limit,
            dialect_name: "GenericDialect",
            marker_strategy: marker,
            start_position: 1,
        }
    }

    fn ints(values: std::ops::RangeInclusive<i64>) -> ParameterBinding {
        ParameterBinding::Multi(values.map(BindValue::Int).collect())
    }

    fn named(name: &str) -> QueryParameter {
        QueryParameter::Named(name.to_string())
    }

    #[test]
    pub fn test_max_count() {
        assert_eq!(bind_value_max_count(false, 0, 5), 5);
        assert_eq!(bind_value_max_count(true, 0, 2), 2);
        assert_eq!(bind_value_max_count(true, 0, 3), 4);
        assert_eq!(bind_value_max_count(true, 0, 5), 8);
        assert_eq!(bind_value_max_count(true, 0, 8), 8);
        assert_eq!(bind_value_max_count(true, 6, 5), 6);
        assert_eq!(bind_value_max_count(true, 4, 5), 5);
        assert_eq!(bind_value_max_count(true, 0, 0), 0);
    }

    #[test]
    pub fn test_expand_with_padding() {
        let interpretation =
            ParameterInterpretation::interpret("select * from t where id in (:ids)", &StandardMarkerStrategy, 1)
                .unwrap();
        let mut bindings = QueryParameterBindings::new();
        bindings.bind(named("ids"), ints(1..=5));
        let expander = expander(true, 0, &StandardMarkerStrategy);

        let sql = expander.expand(interpretation.adjusted_sql(), interpretation.occurrences(), &bindings);
        assert_eq!(sql, "select * from t where id in (?,?,?,?,?,?,?,?)");

        let jdbc = expander.bind(interpretation.occurrences(), &bindings).unwrap();
        assert_eq!(jdbc.len(), 8);
        assert_eq!(jdbc.0[7].position, 8);
        assert_eq!(jdbc.0[7].value, BindValue::Int(5));
        assert_eq!(jdbc.0[4].value, BindValue::Int(5));
        assert_eq!(jdbc.0[3].value, BindValue::Int(4));
    }

    #[test]
    pub fn test_expand_without_parentheses() {
        let interpretation =
            ParameterInterpretation::interpret("where id in :ids and x = :x", &StandardMarkerStrategy, 1).unwrap();
        let mut bindings = QueryParameterBindings::new();
        bindings.bind(named("ids"), ints(1..=3));
        bindings.bind(named("x"), ParameterBinding::Single(BindValue::Int(9)));
        let expander = expander(false, 0, &StandardMarkerStrategy);

        let sql = expander.expand(interpretation.adjusted_sql(), interpretation.occurrences(), &bindings);
        assert_eq!(sql, "where id in (?,?,?) and x = ?");

        let jdbc = expander.bind(interpretation.occurrences(), &bindings).unwrap();
        assert_eq!(jdbc.0.last().map(|b| b.position), Some(4));
        assert_eq!(jdbc.0.last().map(|b| b.value.clone()), Some(BindValue::Int(9)));
    }

    #[test]
    pub fn test_empty_list_becomes_null() {
        let interpretation = ParameterInterpretation::interpret(
            "where a in (:a) or b in :b",
            &StandardMarkerStrategy,
            1,
        )
        .unwrap();
        let mut bindings = QueryParameterBindings::new();
        bindings.bind(named("a"), ParameterBinding::Multi(vec![]));
        bindings.bind(named("b"), ParameterBinding::Multi(vec![]));
        let expander = expander(true, 0, &StandardMarkerStrategy);

        let sql = expander.expand(interpretation.adjusted_sql(), interpretation.occurrences(), &bindings);
        assert_eq!(sql, "where a in (null) or b in (null)");
        assert!(expander.bind(interpretation.occurrences(), &bindings).unwrap().is_empty());
    }

    #[test]
    pub fn test_single_value_enclosed_is_untouched() {
        let interpretation =
            ParameterInterpretation::interpret("where a in ( :a )", &StandardMarkerStrategy, 1).unwrap();
        let mut bindings = QueryParameterBindings::new();
        bindings.bind(named("a"), ints(7..=7));
        let expander = expander(true, 0, &StandardMarkerStrategy);

        let sql = expander.expand(interpretation.adjusted_sql(), interpretation.occurrences(), &bindings);
        assert_eq!(sql, "where a in ( ? )");
    }

    #[test]
    pub fn test_no_multi_valued_is_borrowed() {
        let interpretation =
            ParameterInterpretation::interpret("where a = :a", &StandardMarkerStrategy, 1).unwrap();
        let mut bindings = QueryParameterBindings::new();
        bindings.bind(named("a"), ParameterBinding::Single(BindValue::Int(1)));
        let expander = expander(true, 0, &StandardMarkerStrategy);

        let sql = expander.expand(interpretation.adjusted_sql(), interpretation.occurrences(), &bindings);
        assert!(matches!(sql, std::borrow::Cow::Borrowed(_)));
    }

    #[test]
    pub fn test_positional_markers_renumbered() {
        let strategy = OrdinalMarkerStrategy::default();
        let interpretation =
            ParameterInterpretation::interpret("where a in (:a) and b = :b", &strategy, 1).unwrap();
        assert_eq!(interpretation.adjusted_sql(), "where a in ($1) and b = $2");

        let mut bindings = QueryParameterBindings::new();
        bindings.bind(named("a"), ints(1..=3));
        bindings.bind(named("b"), ParameterBinding::Single(BindValue::Int(0)));
        let expander = expander(false, 0, &strategy);

        let sql = expander.expand(interpretation.adjusted_sql(), interpretation.occurrences(), &bindings);
        assert_eq!(sql, "where a in ($1,$2,$3) and b = $4");
    }

    #[test]
    pub fn test_missing_binding_fails() {
        let interpretation =
            ParameterInterpretation::interpret("where a = :a", &StandardMarkerStrategy, 1).unwrap();
        let expander = expander(false, 0, &StandardMarkerStrategy);

        assert!(expander.bind(interpretation.occurrences(), &QueryParameterBindings::new()).is_err());
    }

    #[test]
    pub fn test_warns_when_limit_exceeded() {
        let interpretation =
            ParameterInterpretation::interpret("where a in (:ids)", &StandardMarkerStrategy, 1).unwrap();
        let mut bindings = QueryParameterBindings::new();
        bindings.bind(named("ids"), ints(1..=5));
        let expander = expander(true, 4, &StandardMarkerStrategy);

        let (sql, logs) = capture_logs(|| {
            expander
                .expand(interpretation.adjusted_sql(), interpretation.occurrences(), &bindings)
                .into_owned()
        });

        assert_eq!(sql, "where a in (?,?,?,?,?)");
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("dialect=GenericDialect"), "{logs}");
        assert!(logs.contains("limit=4"), "{logs}");
        assert!(logs.contains("parameter=ids"), "{logs}");
        assert!(logs.contains("count=5"), "{logs}");
    }
}
