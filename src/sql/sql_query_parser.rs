use crate::config::Settings;
use crate::parser::{ParseError, ParseErrorKind, SqlCursor};
use crate::sql::ParserContext;
use crate::{QueryError, Result};

const PLACEHOLDER_PREFIX: &str = "h-";
const DOMAIN_PLACEHOLDER: &str = "h-domain";
const SCHEMA_PLACEHOLDER: &str = "h-schema";
const CATALOG_PLACEHOLDER: &str = "h-catalog";

/// Expands `{...}` escapes in native SQL: schema placeholders and alias
/// references such as `{p}`, `{p.name}` and `{p.*}`.
pub struct SqlQueryParser<'a> {
    original: &'a str,
    context: &'a dyn ParserContext,
    settings: &'a Settings,
    aliases_found: usize,
}

impl<'a> SqlQueryParser<'a> {
    pub fn new(original: &'a str, context: &'a dyn ParserContext, settings: &'a Settings) -> Self {
        Self {
            original,
            context,
            settings,
            aliases_found: 0,
        }
    }

    /// Number of alias references resolved by the last `process` call.
    pub fn aliases_found(&self) -> usize {
        self.aliases_found
    }

    pub fn query_has_aliases(&self) -> bool {
        self.aliases_found > 0
    }

    pub fn process(&mut self) -> Result<String> {
        self.aliases_found = 0;
        let mut cursor = SqlCursor::new(self.original);
        let mut result = String::with_capacity(self.original.len());
        let mut single_quoted = false;
        let mut double_quoted = false;
        let mut token: Option<(usize, String)> = None;

        while !cursor.eof() {
            let c = cursor.current();
            match &mut token {
                Some((pivot, text)) => match c {
                    '}' => {
                        let pivot = *pivot;
                        let text = std::mem::take(text);
                        token = None;
                        self.substitute(&text, pivot, &cursor, &mut result)?;
                    }
                    '{' => {
                        return ParseError::new(
                            ParseErrorKind::NestedEscape,
                            "Nested '{' inside an escape sequence",
                            *pivot,
                            &cursor,
                        )
                        .err()
                        .map_err(QueryError::from);
                    }
                    other => text.push(other),
                },
                None => {
                    match c {
                        '\'' if !double_quoted => single_quoted = !single_quoted,
                        '"' if !single_quoted => double_quoted = !double_quoted,
                        '{' if !single_quoted && !double_quoted => {
                            token = Some((cursor.position, String::new()));
                            cursor.next();
                            continue;
                        }
                        _ => {}
                    }
                    result.push(c);
                }
            }
            cursor.next();
        }

        if let Some((pivot, _)) = token {
            let error = ParseError {
                kind: ParseErrorKind::UnterminatedEscape,
                message: "Unmatched '{' in native query".to_string(),
                text: cursor.text_from_range(pivot, cursor.length),
                start: pivot,
                end: cursor.length,
            };
            return Err(error.into());
        }

        Ok(result)
    }

    fn substitute(&mut self, token: &str, pivot: usize, cursor: &SqlCursor, result: &mut String) -> Result<()> {
        if token.starts_with(PLACEHOLDER_PREFIX) {
            return self.substitute_placeholder(token, pivot, cursor, result);
        }

        let Some((alias, property)) = token.split_once('.') else {
            if self.context.is_entity_alias(token) || self.context.is_collection_alias(token) {
                self.aliases_found += 1;
                result.push_str(token);
            } else {
                push_verbatim(token, result);
            }
            return Ok(());
        };

        if self.context.is_collection_alias(alias) {
            let resolved = self.resolve_collection_property(alias, property)?;
            result.push_str(&resolved);
        } else if self.context.is_entity_alias(alias) {
            let resolved = self.resolve_property(alias, property)?;
            result.push_str(&resolved);
        } else {
            push_verbatim(token, result);
        }
        Ok(())
    }

    fn substitute_placeholder(
        &self,
        token: &str,
        pivot: usize,
        cursor: &SqlCursor,
        result: &mut String,
    ) -> Result<()> {
        let catalog = self.settings.default_catalog.as_deref();
        let schema = self.settings.default_schema.as_deref();
        let qualifier = match token {
            DOMAIN_PLACEHOLDER => match (catalog, schema) {
                (Some(catalog), Some(schema)) => Some(format!("{}.{}", catalog, schema)),
                (Some(name), None) | (None, Some(name)) => Some(name.to_string()),
                (None, None) => None,
            },
            SCHEMA_PLACEHOLDER => schema.map(str::to_string),
            CATALOG_PLACEHOLDER => catalog.map(str::to_string),
            _ => {
                let message = format!("Unknown placeholder {{{}}} in native query", token);
                return ParseError::new(ParseErrorKind::UnknownPlaceholder, &message, pivot, cursor)
                    .err()
                    .map_err(QueryError::from);
            }
        };
        if let Some(qualifier) = qualifier {
            result.push_str(&qualifier);
            result.push('.');
        }
        Ok(())
    }

    fn resolve_collection_property(&mut self, alias: &str, property: &str) -> Result<String> {
        let persister = self
            .context
            .collection_persister(alias)
            .ok_or_else(|| QueryError::alias(format!("Unknown collection alias [{}]", alias)))?;
        let suffix = self.context.collection_suffix(alias).unwrap_or_default();
        let overrides = self.context.property_results(alias);

        match property {
            "*" => {
                if overrides.is_some_and(|o| !o.is_empty()) {
                    return Err(QueryError::alias(
                        "Using return-property together with * syntax is not supported",
                    ));
                }
                self.aliases_found += 1;
                let mut fragment = persister.select_fragment(alias, suffix);
                if self.context.is_entity_alias(alias) {
                    fragment.push_str(", ");
                    fragment.push_str(&self.resolve_property(alias, "*")?);
                }
                Ok(fragment)
            }
            "element.*" => self.resolve_property(alias, "*"),
            _ => {
                let column_aliases = overrides
                    .and_then(|o| o.get(property))
                    .cloned()
                    .unwrap_or_else(|| persister.collection_property_column_aliases(property, suffix));
                self.single_column(alias, property, column_aliases)
            }
        }
    }

    fn resolve_property(&mut self, alias: &str, property: &str) -> Result<String> {
        let persister = self
            .context
            .entity_persister(alias)
            .ok_or_else(|| QueryError::alias(format!("Unknown entity alias [{}]", alias)))?;
        let suffix = self.context.entity_suffix(alias).unwrap_or_default();
        let overrides = self.context.property_results(alias);

        if property == "*" {
            if overrides.is_some_and(|o| !o.is_empty()) {
                return Err(QueryError::alias(
                    "Using return-property together with * syntax is not supported",
                ));
            }
            self.aliases_found += 1;
            return Ok(persister.select_fragment(alias, suffix));
        }

        let column_aliases = overrides
            .and_then(|o| o.get(property))
            .cloned()
            .unwrap_or_else(|| persister.property_column_aliases(property, suffix));
        self.single_column(alias, property, column_aliases)
    }

    fn single_column(&mut self, alias: &str, property: &str, mut column_aliases: Vec<String>) -> Result<String> {
        match column_aliases.len() {
            0 => Err(QueryError::alias(format!(
                "No column name found for property [{}] for alias [{}]",
                property, alias
            ))),
            1 => {
                self.aliases_found += 1;
                Ok(column_aliases.remove(0))
            }
            n => Err(QueryError::alias(format!(
                "SQL queries only support properties mapped to a single column - property [{}] is mapped to {} columns",
                property, n
            ))),
        }
    }
}

fn push_verbatim(token: &str, result: &mut String) {
    result.push('{');
    result.push_str(token);
    result.push('}');
}

#[cfg(test)]
mod tests {
    use crate::_fixtures::fixtures::metamodel;
    use crate::config::Settings;
    use crate::parser::ParseErrorKind;
    use crate::results::{CollectionReturn, FetchReturn, ResultBuilder, ResultSetMapping, ResultSetMappingProcessor, RootReturn};
    use crate::sql::SqlQueryParser;
    use crate::QueryError;

    fn person_mapping(root: RootReturn) -> ResultSetMapping {
        let mut mapping = ResultSetMapping::new();
        mapping.add_result_builder(ResultBuilder::Root(root));
        mapping
    }

    fn rewrite(sql: &str, mapping: &ResultSetMapping, settings: &Settings) -> Result<(String, usize), QueryError> {
        let metamodel = metamodel();
        let mut processor = ResultSetMappingProcessor::new(mapping, &metamodel);
        processor.process()?;
        let mut parser = SqlQueryParser::new(sql, &processor, settings);
        let processed = parser.process()?;
        Ok((processed, parser.aliases_found()))
    }

    #[test]
    pub fn test_star_and_property() {
        let mapping = person_mapping(RootReturn::new("p", "Person"));
        let (sql, found) = rewrite(
            "select {p.*} from person p where {p.id} = :id",
            &mapping,
            &Settings::default(),
        )
        .unwrap();

        assert_eq!(
            sql,
            "select p.id as id0_a_, p.name as name1_a_, p.age as age2_a_, p.street as street3_a_, p.city as city4_a_, p.employer_id as employer_i5_a_ from person p where id0_a_ = :id"
        );
        assert_eq!(found, 2);
    }

    #[test]
    pub fn test_bare_alias_and_unknown_tokens() {
        let mapping = person_mapping(RootReturn::new("p", "Person"));
        let (sql, found) = rewrite(
            "select {fn ucase(name)}, {x.y} from person {p}",
            &mapping,
            &Settings::default(),
        )
        .unwrap();

        assert_eq!(sql, "select {fn ucase(name)}, {x.y} from person p");
        assert_eq!(found, 1);
    }

    #[test]
    pub fn test_braces_inside_quotes_are_kept() {
        let mapping = person_mapping(RootReturn::new("p", "Person"));
        let (sql, found) = rewrite(
            "select '{p.name}', \"{p}\" from person p",
            &mapping,
            &Settings::default(),
        )
        .unwrap();

        assert_eq!(sql, "select '{p.name}', \"{p}\" from person p");
        assert_eq!(found, 0);
    }

    #[test]
    pub fn test_return_property_overrides() {
        let mapping = person_mapping(RootReturn::new("p", "Person").add_property("name", "full_name"));
        let (sql, _) = rewrite("select {p.name} from person p", &mapping, &Settings::default()).unwrap();
        assert_eq!(sql, "select full_name from person p");

        match rewrite("select {p.*} from person p", &mapping, &Settings::default()) {
            Err(QueryError::AliasResolution(message)) => assert!(message.contains("* syntax")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    pub fn test_multi_column_and_missing_property() {
        let mapping = person_mapping(RootReturn::new("p", "Person"));

        match rewrite("select {p.address} from person p", &mapping, &Settings::default()) {
            Err(QueryError::AliasResolution(message)) => assert!(message.contains("mapped to 2 columns")),
            other => panic!("unexpected {:?}", other),
        }
        match rewrite("select {p.shoe_size} from person p", &mapping, &Settings::default()) {
            Err(QueryError::AliasResolution(message)) => {
                assert_eq!(message, "No column name found for property [shoe_size] for alias [p]")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    pub fn test_schema_placeholders() {
        let mapping = ResultSetMapping::new();
        let settings = Settings::default().with_default_catalog("main").with_default_schema("hr");
        let (sql, found) = rewrite(
            "select * from {h-domain}person, {h-schema}phone, {h-catalog}company",
            &mapping,
            &settings,
        )
        .unwrap();

        assert_eq!(sql, "select * from main.hr.person, hr.phone, main.company");
        assert_eq!(found, 0);

        let (sql, _) = rewrite("select * from {h-schema}person", &mapping, &Settings::default()).unwrap();
        assert_eq!(sql, "select * from person");
    }

    #[test]
    pub fn test_escape_errors() {
        let mapping = ResultSetMapping::new();
        let settings = Settings::default();

        let kind_of = |sql: &str| rewrite(sql, &mapping, &settings).err().and_then(|e| e.parse_kind());

        assert_eq!(kind_of("select {h-table} from x"), Some(ParseErrorKind::UnknownPlaceholder));
        assert_eq!(kind_of("select {p.{name}} from x"), Some(ParseErrorKind::NestedEscape));
        assert_eq!(kind_of("select {p.name from x"), Some(ParseErrorKind::UnterminatedEscape));
    }

    #[test]
    pub fn test_collection_aliases() {
        let mut mapping = person_mapping(RootReturn::new("p", "Person"));
        mapping.add_legacy_fetch(FetchReturn::new("ph", "p", "phones"));
        let (sql, _) = rewrite(
            "select {ph.key}, {ph.element}, {ph.element.*} from phone ph",
            &mapping,
            &Settings::default(),
        )
        .unwrap();

        assert_eq!(sql, "select person_id0_0__, id1_0__, ph.id as id0_b_, ph.number as number1_b_ from phone ph");
    }

    #[test]
    pub fn test_collection_star() {
        let mut mapping = ResultSetMapping::new();
        mapping.add_result_builder(ResultBuilder::Collection(CollectionReturn::new("n", "Person", "nicknames")));
        let (sql, found) = rewrite("select {n.*} from person_nicknames n", &mapping, &Settings::default()).unwrap();

        assert_eq!(
            sql,
            "select n.person_id as person_id0_0__, n.position as position1_0__, n.nickname as nickname2_0__ from person_nicknames n"
        );
        assert_eq!(found, 1);
    }
}
