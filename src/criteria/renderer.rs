use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::criteria::{
    BooleanOperator, CaseExpression, CriteriaQuery, CteCriteria, CteMaterialization, Expression, FromSource, InValues,
    Join, JoinTarget, JoinType, JsonBehavior, JsonExpression, JsonNullClause, JsonWrapper, Literal, NullPrecedence,
    Predicate, QueryPart, QuerySpec, Root, SortSpecification, Window, WindowFunction, XmlExpression,
};
use crate::metamodel::{CollectionPersister, EntityPersister, MappingMetamodel, PropertyType};
use crate::parameter::{
    JdbcParameterBindings, ParameterBinding, ParameterMarkerStrategy, QueryParameter, QueryParameterBindings,
};
use crate::{QueryError, Result};

/// SQL text of a criteria query and the parameter behind each marker, in
/// marker order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub parameters: Vec<QueryParameter>,
    pub start_position: usize,
}

impl RenderedQuery {
    /// Binds one value per marker. Collection-valued bindings are rejected,
    /// the rendered text has a fixed number of markers.
    pub fn bind(&self, bindings: &QueryParameterBindings) -> Result<JdbcParameterBindings> {
        let mut jdbc = JdbcParameterBindings::none();
        for (index, parameter) in self.parameters.iter().enumerate() {
            match bindings.get(parameter) {
                Some(ParameterBinding::Single(value)) => jdbc.push(self.start_position + index, value.clone()),
                Some(ParameterBinding::Multi(_)) => {
                    return Err(QueryError::binding(format!(
                        "Parameter [{}] of a criteria query cannot be bound to multiple values",
                        parameter
                    )));
                }
                None => {
                    return Err(QueryError::binding(format!(
                        "No value bound for parameter [{}]",
                        parameter
                    )));
                }
            }
        }
        Ok(jdbc)
    }
}

/// Compiles criteria trees to ANSI-style SQL.
///
/// With a metamodel, entity names become table names, attribute paths become
/// columns and association joins get their mapped join condition. Without
/// one, names are written as given and association joins are rejected.
#[derive(Debug)]
pub struct SqlRenderer<'a> {
    marker_strategy: &'a dyn ParameterMarkerStrategy,
    start_position: usize,
    metamodel: Option<&'a dyn MappingMetamodel>,
}

impl<'a> SqlRenderer<'a> {
    pub fn new(marker_strategy: &'a dyn ParameterMarkerStrategy, start_position: usize) -> Self {
        Self {
            marker_strategy,
            start_position,
            metamodel: None,
        }
    }

    pub fn with_metamodel(mut self, metamodel: &'a dyn MappingMetamodel) -> Self {
        self.metamodel = Some(metamodel);
        self
    }

    pub fn render(&self, query: &CriteriaQuery) -> Result<RenderedQuery> {
        let mut context = RenderContext {
            renderer: self,
            ctes: query.ctes(),
            sql: String::new(),
            parameters: Vec::new(),
            scopes: Vec::new(),
        };
        context.render_query(query)?;
        debug!(sql = %context.sql, parameters = context.parameters.len(), "rendered criteria query");
        Ok(RenderedQuery {
            sql: context.sql,
            parameters: context.parameters,
            start_position: self.start_position,
        })
    }
}

#[derive(Debug, Clone)]
enum AliasTarget {
    Entity(Arc<dyn EntityPersister>),
    Collection(Arc<dyn CollectionPersister>),
    Cte(String),
    Unmapped,
}

/// Table and join condition of one join, resolved before any SQL is written
/// so that select-list paths can already see the join aliases.
#[derive(Debug, Clone)]
struct ResolvedJoin {
    table: String,
    /// `(joined column, parent column)` pairs, both qualified.
    conditions: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct Scope {
    aliases: IndexMap<String, AliasTarget>,
    joins: HashMap<String, ResolvedJoin>,
}

struct RenderContext<'r, 'a> {
    renderer: &'r SqlRenderer<'a>,
    ctes: &'r [CteCriteria],
    sql: String,
    parameters: Vec<QueryParameter>,
    scopes: Vec<Scope>,
}

impl<'r, 'a> RenderContext<'r, 'a> {
    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn render_query(&mut self, query: &CriteriaQuery) -> Result<()> {
        if !query.ctes().is_empty() {
            self.push("with ");
            if query.ctes().iter().any(CteCriteria::is_recursive) {
                self.push("recursive ");
            }
            for (i, cte) in query.ctes().iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.render_cte(cte)?;
            }
            self.push(" ");
        }
        self.render_part(query.body())?;
        self.render_order_and_window(
            query.sort_specifications(),
            query.offset_expression(),
            query.fetch_expression(),
        )
    }

    fn render_cte(&mut self, cte: &CteCriteria) -> Result<()> {
        self.push(&format!("{} ({}) as ", cte.name(), cte.attributes().join(", ")));
        match cte.get_materialization() {
            CteMaterialization::Materialized => self.push("materialized "),
            CteMaterialization::NotMaterialized => self.push("not materialized "),
            CteMaterialization::Undefined => {}
        }
        self.push("(");
        self.render_part(cte.definition())?;
        self.push(")");
        if let Some(search) = cte.search_clause() {
            self.push(&format!(
                " search {} by {} set {}",
                search.kind,
                search.by.join(", "),
                search.set_attribute
            ));
        }
        if let Some(cycle) = cte.cycle_clause() {
            self.push(&format!(
                " cycle {} set {} to {} default {}",
                cycle.attributes.join(", "),
                cycle.mark_attribute,
                cycle.cycle_value,
                cycle.no_cycle_value
            ));
            if let Some(path) = &cycle.path_attribute {
                self.push(&format!(" using {}", path));
            }
        }
        Ok(())
    }

    fn render_part(&mut self, part: &QueryPart) -> Result<()> {
        match part {
            QueryPart::Spec(spec) => self.render_spec(spec),
            QueryPart::SetOperation { operator, left, right } => {
                self.render_operand(left, false)?;
                self.push(&format!(" {} ", operator));
                self.render_operand(right, true)
            }
        }
    }

    /// Set operations associate to the left; a right-hand set operation and
    /// any spec with its own ordering or row window are parenthesized.
    fn render_operand(&mut self, part: &QueryPart, right_hand: bool) -> Result<()> {
        let wrap = match part {
            QueryPart::Spec(spec) => !spec.order_by.is_empty() || spec.offset.is_some() || spec.fetch.is_some(),
            QueryPart::SetOperation { .. } => right_hand,
        };
        if wrap {
            self.push("(");
        }
        self.render_part(part)?;
        if wrap {
            self.push(")");
        }
        Ok(())
    }

    fn render_subquery(&mut self, part: &QueryPart) -> Result<()> {
        self.push("(");
        self.render_part(part)?;
        self.push(")");
        Ok(())
    }

    fn render_spec(&mut self, spec: &QuerySpec) -> Result<()> {
        let scope = self.resolve_scope(&spec.roots)?;
        self.scopes.push(scope);
        let result = self.render_spec_body(spec);
        self.scopes.pop();
        result
    }

    fn render_spec_body(&mut self, spec: &QuerySpec) -> Result<()> {
        self.push("select ");
        if spec.distinct {
            self.push("distinct ");
        }
        if spec.selections.is_empty() {
            self.push("*");
        }
        for (i, selection) in spec.selections.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.render_expression(&selection.expression)?;
            if let Some(alias) = &selection.alias {
                self.push(&format!(" as {}", alias));
            }
        }
        if !spec.roots.is_empty() {
            self.push(" from ");
            for (i, root) in spec.roots.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.render_root(root)?;
            }
        }
        self.render_condition(" where ", spec.restriction.as_ref())?;
        if !spec.group_by.is_empty() {
            self.push(" group by ");
            self.render_expression_list(&spec.group_by)?;
        }
        self.render_condition(" having ", spec.having.as_ref())?;
        self.render_order_and_window(&spec.order_by, spec.offset.as_ref(), spec.fetch.as_ref())
    }

    /// A condition folding to `true` leaves the clause out.
    fn render_condition(&mut self, keyword: &str, predicate: Option<&Predicate>) -> Result<()> {
        let Some(predicate) = predicate else {
            return Ok(());
        };
        match predicate.clone().fold_constants() {
            Predicate::Constant(true) => Ok(()),
            folded => {
                self.push(keyword);
                self.render_predicate(&folded)
            }
        }
    }

    fn render_order_and_window(
        &mut self,
        order_by: &[SortSpecification],
        offset: Option<&Expression>,
        fetch: Option<&Expression>,
    ) -> Result<()> {
        if !order_by.is_empty() {
            self.push(" order by ");
            self.render_sorts(order_by)?;
        }
        if let Some(offset) = offset {
            self.push(" offset ");
            self.render_expression(offset)?;
            self.push(" rows");
        }
        if let Some(fetch) = fetch {
            self.push(" fetch first ");
            self.render_expression(fetch)?;
            self.push(" rows only");
        }
        Ok(())
    }

    fn render_sorts(&mut self, sorts: &[SortSpecification]) -> Result<()> {
        for (i, sort) in sorts.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.render_expression(&sort.expression)?;
            self.push(&format!(" {}", sort.direction));
            match sort.nulls {
                NullPrecedence::First => self.push(" nulls first"),
                NullPrecedence::Last => self.push(" nulls last"),
                NullPrecedence::None => {}
            }
        }
        Ok(())
    }

    // from clause

    fn find_cte(&self, name: &str) -> Result<&'r CteCriteria> {
        self.ctes
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| QueryError::criteria(format!("Unknown CTE [{}]", name)))
    }

    fn entity_target(&self, entity_name: &str) -> Result<(String, AliasTarget)> {
        match self.renderer.metamodel {
            Some(metamodel) => {
                let persister = metamodel.entity(entity_name)?;
                Ok((persister.table_name().to_string(), AliasTarget::Entity(persister)))
            }
            None => Ok((entity_name.to_string(), AliasTarget::Unmapped)),
        }
    }

    fn resolve_scope(&self, roots: &[Root]) -> Result<Scope> {
        let mut scope = Scope::default();
        for root in roots {
            let target = match &root.source {
                FromSource::Entity(entity_name) => self.entity_target(entity_name)?.1,
                FromSource::Cte(name) => AliasTarget::Cte(self.find_cte(name)?.name().to_string()),
            };
            self.register(&mut scope, &root.alias, target)?;
            self.resolve_joins(&mut scope, &root.joins)?;
        }
        Ok(scope)
    }

    fn register(&self, scope: &mut Scope, alias: &str, target: AliasTarget) -> Result<()> {
        if scope.aliases.contains_key(alias) {
            return Err(QueryError::criteria(format!("Duplicate alias [{}]", alias)));
        }
        scope.aliases.insert(alias.to_string(), target);
        Ok(())
    }

    fn resolve_joins(&self, scope: &mut Scope, joins: &[Join]) -> Result<()> {
        for join in joins {
            let (table, target, conditions) = match &join.target {
                JoinTarget::Entity(entity_name) => {
                    let (table, target) = self.entity_target(entity_name)?;
                    (table, target, Vec::new())
                }
                JoinTarget::Cte(name) => {
                    let cte = self.find_cte(name)?;
                    (cte.name().to_string(), AliasTarget::Cte(cte.name().to_string()), Vec::new())
                }
                JoinTarget::Attribute { parent_alias, attribute } => {
                    let parent = scope
                        .aliases
                        .get(parent_alias)
                        .cloned()
                        .ok_or_else(|| QueryError::criteria(format!("Unknown alias [{}]", parent_alias)))?;
                    self.resolve_association(&parent, parent_alias, attribute, &join.alias)?
                }
            };
            if join.join_type == JoinType::Cross && join.on.is_some() {
                return Err(QueryError::criteria(format!(
                    "Cross join [{}] cannot have an ON condition",
                    join.alias
                )));
            }
            if join.join_type != JoinType::Cross && conditions.is_empty() && join.on.is_none() {
                return Err(QueryError::criteria(format!(
                    "Join [{}] requires an ON condition",
                    join.alias
                )));
            }
            self.register(scope, &join.alias, target)?;
            scope.joins.insert(join.alias.clone(), ResolvedJoin { table, conditions });
            self.resolve_joins(scope, &join.joins)?;
        }
        Ok(())
    }

    fn resolve_association(
        &self,
        parent: &AliasTarget,
        parent_alias: &str,
        attribute: &str,
        alias: &str,
    ) -> Result<(String, AliasTarget, Vec<(String, String)>)> {
        let (Some(metamodel), AliasTarget::Entity(owner)) = (self.renderer.metamodel, parent) else {
            return Err(QueryError::unsupported(format!(
                "Attribute join [{}.{}] requires a mapped entity",
                parent_alias, attribute
            )));
        };
        let qualify = |table_alias: &str, columns: Vec<String>| -> Vec<String> {
            columns.into_iter().map(|c| format!("{}.{}", table_alias, c)).collect()
        };
        match owner.property_type(attribute) {
            Some(PropertyType::ToOne {
                associated_entity,
                identifying_table,
                target_key_property,
            }) => {
                if identifying_table != owner.table_name() {
                    return Err(QueryError::unsupported(format!(
                        "Attribute join [{}.{}] through join table [{}] is not supported",
                        parent_alias, attribute, identifying_table
                    )));
                }
                let target = metamodel.entity(&associated_entity)?;
                let target_columns = qualify(alias, target.property_column_names(&target_key_property));
                let owner_columns = qualify(parent_alias, owner.property_column_names(attribute));
                Ok((
                    target.table_name().to_string(),
                    AliasTarget::Entity(target),
                    target_columns.into_iter().zip(owner_columns).collect(),
                ))
            }
            Some(PropertyType::Collection { role, lhs_property }) => {
                let collection = metamodel.collection(&role)?;
                if collection.is_many_to_many() {
                    return Err(QueryError::unsupported(format!(
                        "Attribute join [{}.{}] over many-to-many collection [{}] is not supported",
                        parent_alias, attribute, role
                    )));
                }
                let owner_columns = match &lhs_property {
                    Some(property) => owner.property_column_names(property),
                    None => owner.identifier_column_names(),
                };
                let conditions = qualify(alias, collection.key_column_names())
                    .into_iter()
                    .zip(qualify(parent_alias, owner_columns))
                    .collect();
                if collection.is_one_to_many() {
                    let element_name = collection.element_entity_name().ok_or_else(|| {
                        QueryError::mapping(format!("Collection [{}] has no element entity", role))
                    })?;
                    let element = metamodel.entity(element_name)?;
                    Ok((element.table_name().to_string(), AliasTarget::Entity(element), conditions))
                } else {
                    Ok((
                        collection.table_name().to_string(),
                        AliasTarget::Collection(collection),
                        conditions,
                    ))
                }
            }
            Some(_) => Err(QueryError::criteria(format!(
                "Attribute [{}] of [{}] is not an association",
                attribute,
                owner.entity_name()
            ))),
            None => Err(QueryError::mapping(format!(
                "Unknown attribute [{}] of [{}]",
                attribute,
                owner.entity_name()
            ))),
        }
    }

    fn resolved_join(&self, alias: &str) -> Result<ResolvedJoin> {
        self.scopes
            .last()
            .and_then(|scope| scope.joins.get(alias))
            .cloned()
            .ok_or_else(|| QueryError::criteria(format!("Unknown alias [{}]", alias)))
    }

    fn render_root(&mut self, root: &Root) -> Result<()> {
        let table = match &root.source {
            FromSource::Entity(entity_name) => self.entity_target(entity_name)?.0,
            FromSource::Cte(name) => name.clone(),
        };
        self.push(&format!("{} {}", table, root.alias));
        self.render_joins(&root.joins)
    }

    fn render_joins(&mut self, joins: &[Join]) -> Result<()> {
        for join in joins {
            let resolved = self.resolved_join(&join.alias)?;
            self.push(&format!(" {} {} {}", join.join_type, resolved.table, join.alias));
            if !resolved.conditions.is_empty() || join.on.is_some() {
                self.push(" on ");
                let mapped: Vec<String> = resolved
                    .conditions
                    .iter()
                    .map(|(joined, parent)| format!("{} = {}", joined, parent))
                    .collect();
                self.push(&mapped.join(" and "));
                if let Some(on) = &join.on {
                    if mapped.is_empty() {
                        self.render_predicate(on)?;
                    } else {
                        self.push(" and ");
                        self.render_nested_predicate(on)?;
                    }
                }
            }
            self.render_joins(&join.joins)?;
        }
        Ok(())
    }

    // predicates

    fn render_predicate(&mut self, predicate: &Predicate) -> Result<()> {
        match predicate {
            Predicate::Junction { operator, predicates } => {
                if predicates.is_empty() {
                    self.push(if *operator == BooleanOperator::And { "1=1" } else { "1=0" });
                    return Ok(());
                }
                for (i, member) in predicates.iter().enumerate() {
                    if i > 0 {
                        self.push(&format!(" {} ", operator));
                    }
                    self.render_nested_predicate(member)?;
                }
                Ok(())
            }
            Predicate::Comparison { left, operator, right } => {
                self.render_expression(left)?;
                self.push(&format!(" {} ", operator));
                self.render_expression(right)
            }
            Predicate::IsNull { expression, negated } => {
                self.render_expression(expression)?;
                self.push(if *negated { " is not null" } else { " is null" });
                Ok(())
            }
            Predicate::In {
                expression,
                values,
                negated,
            } => match values {
                InValues::List(list) if list.is_empty() => {
                    self.push(if *negated { "1=1" } else { "1=0" });
                    Ok(())
                }
                InValues::List(list) => {
                    self.render_expression(expression)?;
                    self.push(if *negated { " not in (" } else { " in (" });
                    self.render_expression_list(list)?;
                    self.push(")");
                    Ok(())
                }
                InValues::Subquery(subquery) => {
                    self.render_expression(expression)?;
                    self.push(if *negated { " not in " } else { " in " });
                    self.render_subquery(subquery)
                }
            },
            Predicate::Like {
                expression,
                pattern,
                escape,
                negated,
            } => {
                self.render_expression(expression)?;
                self.push(if *negated { " not like " } else { " like " });
                self.render_expression(pattern)?;
                if let Some(escape) = escape {
                    self.push(&format!(" escape {}", Literal::String(escape.to_string())));
                }
                Ok(())
            }
            Predicate::Between {
                expression,
                lower,
                upper,
                negated,
            } => {
                self.render_expression(expression)?;
                self.push(if *negated { " not between " } else { " between " });
                self.render_expression(lower)?;
                self.push(" and ");
                self.render_expression(upper)
            }
            Predicate::Exists { subquery, negated } => {
                self.push(if *negated { "not exists " } else { "exists " });
                self.render_subquery(subquery)
            }
            Predicate::BooleanExpression(expression) => self.render_expression(expression),
            Predicate::Constant(value) => {
                self.push(if *value { "1=1" } else { "1=0" });
                Ok(())
            }
            Predicate::Negated(inner) => {
                self.push("not (");
                self.render_predicate(inner)?;
                self.push(")");
                Ok(())
            }
        }
    }

    fn render_nested_predicate(&mut self, predicate: &Predicate) -> Result<()> {
        let wrap = matches!(predicate, Predicate::Junction { predicates, .. } if predicates.len() > 1);
        if wrap {
            self.push("(");
        }
        self.render_predicate(predicate)?;
        if wrap {
            self.push(")");
        }
        Ok(())
    }

    // expressions

    fn render_expression_list(&mut self, expressions: &[Expression]) -> Result<()> {
        for (i, expression) in expressions.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.render_expression(expression)?;
        }
        Ok(())
    }

    fn render_operand_expression(&mut self, expression: &Expression) -> Result<()> {
        if expression.is_compound() {
            self.push("(");
            self.render_expression(expression)?;
            self.push(")");
            Ok(())
        } else {
            self.render_expression(expression)
        }
    }

    fn render_parameter(&mut self, parameter: &QueryParameter) {
        let position = self.renderer.start_position + self.parameters.len();
        let marker = self.renderer.marker_strategy.create_marker(position);
        self.parameters.push(parameter.clone());
        self.push(&marker);
    }

    fn lookup(&self, alias: &str) -> Result<AliasTarget> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.aliases.get(alias))
            .cloned()
            .ok_or_else(|| QueryError::criteria(format!("Unknown alias [{}]", alias)))
    }

    fn path_column(&self, alias: &str, attribute: &str) -> Result<String> {
        let columns = match self.lookup(alias)? {
            AliasTarget::Unmapped => return Ok(format!("{}.{}", alias, attribute)),
            AliasTarget::Cte(name) => {
                let cte = self.find_cte(&name)?;
                if !cte.exposes(attribute) {
                    return Err(QueryError::criteria(format!(
                        "CTE [{}] has no attribute [{}]",
                        name, attribute
                    )));
                }
                return Ok(format!("{}.{}", alias, attribute));
            }
            AliasTarget::Entity(persister) => persister.property_column_names(attribute),
            AliasTarget::Collection(collection) => match attribute {
                "element" => collection.element_column_names(),
                "index" => collection.index_column_names(),
                "key" => collection.key_column_names(),
                _ => Vec::new(),
            },
        };
        match columns.as_slice() {
            [column] => Ok(format!("{}.{}", alias, column)),
            [] => Err(QueryError::mapping(format!(
                "Path [{}.{}] does not resolve to a column",
                alias, attribute
            ))),
            _ => Err(QueryError::criteria(format!(
                "Path [{}.{}] maps to {} columns and cannot be used as a single expression",
                alias,
                attribute,
                columns.len()
            ))),
        }
    }

    fn render_expression(&mut self, expression: &Expression) -> Result<()> {
        match expression {
            Expression::Literal(literal) => {
                if !literal.is_renderable() {
                    return Err(QueryError::criteria(format!("Literal [{}] has no SQL form", literal)));
                }
                self.push(&literal.to_string());
            }
            Expression::Parameter(parameter) => self.render_parameter(parameter),
            Expression::Path { alias, attribute } => {
                let column = self.path_column(alias, attribute)?;
                self.push(&column);
            }
            Expression::CteAttribute { alias, attribute } => self.push(&format!("{}.{}", alias, attribute)),
            Expression::Arithmetic { operator, left, right } => {
                self.render_operand_expression(left)?;
                self.push(&format!(" {} ", operator));
                self.render_operand_expression(right)?;
            }
            Expression::Negated(inner) => {
                self.push("-");
                self.render_operand_expression(inner)?;
            }
            Expression::Concat(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        self.push(" || ");
                    }
                    self.render_operand_expression(part)?;
                }
            }
            Expression::Function { name, arguments } => {
                self.push(&format!("{}(", name));
                self.render_expression_list(arguments)?;
                self.push(")");
            }
            Expression::Case(case) => self.render_case(case)?,
            Expression::Coalesce(arguments) => {
                self.push("coalesce(");
                self.render_expression_list(arguments)?;
                self.push(")");
            }
            Expression::NullIf(left, right) => {
                self.push("nullif(");
                self.render_expression(left)?;
                self.push(", ");
                self.render_expression(right)?;
                self.push(")");
            }
            Expression::Cast {
                expression,
                target_type,
            } => {
                self.push("cast(");
                self.render_expression(expression)?;
                self.push(&format!(" as {})", target_type));
            }
            Expression::Subquery(part) => self.render_subquery(part)?,
            Expression::Window(function) => self.render_window_function(function)?,
            Expression::Json(json) => self.render_json(json)?,
            Expression::Xml(xml) => self.render_xml(xml)?,
        }
        Ok(())
    }

    fn render_case(&mut self, case: &CaseExpression) -> Result<()> {
        let otherwise = match case {
            CaseExpression::Searched { whens, otherwise } => {
                self.push("case");
                for (condition, result) in whens {
                    self.push(" when ");
                    self.render_predicate(condition)?;
                    self.push(" then ");
                    self.render_expression(result)?;
                }
                otherwise
            }
            CaseExpression::Simple {
                operand,
                whens,
                otherwise,
            } => {
                self.push("case ");
                self.render_expression(operand)?;
                for (value, result) in whens {
                    self.push(" when ");
                    self.render_expression(value)?;
                    self.push(" then ");
                    self.render_expression(result)?;
                }
                otherwise
            }
        };
        if let Some(otherwise) = otherwise {
            self.push(" else ");
            self.render_expression(otherwise)?;
        }
        self.push(" end");
        Ok(())
    }

    fn render_filter(&mut self, filter: Option<&Predicate>) -> Result<()> {
        if let Some(filter) = filter {
            self.push(" filter (where ");
            self.render_predicate(filter)?;
            self.push(")");
        }
        Ok(())
    }

    fn render_window_function(&mut self, function: &WindowFunction) -> Result<()> {
        self.push(&format!("{}(", function.name));
        self.render_expression_list(&function.arguments)?;
        self.push(")");
        self.render_filter(function.filter.as_ref())?;
        self.push(" over (");
        self.render_window(&function.window)?;
        self.push(")");
        Ok(())
    }

    fn render_window(&mut self, window: &Window) -> Result<()> {
        let mut clauses = 0;
        if !window.partition_by.is_empty() {
            self.push("partition by ");
            self.render_expression_list(&window.partition_by)?;
            clauses += 1;
        }
        if !window.order_by.is_empty() {
            if clauses > 0 {
                self.push(" ");
            }
            self.push("order by ");
            self.render_sorts(&window.order_by)?;
            clauses += 1;
        }
        if let Some(frame) = &window.frame {
            if clauses > 0 {
                self.push(" ");
            }
            self.push(&frame.to_string());
        }
        Ok(())
    }

    fn render_json_behavior(&mut self, behavior: &JsonBehavior, on: &str, allow_empty: bool) -> Result<()> {
        let text = match behavior {
            JsonBehavior::Unspecified => return Ok(()),
            JsonBehavior::Null => "null",
            JsonBehavior::Error => "error",
            JsonBehavior::EmptyArray | JsonBehavior::EmptyObject if !allow_empty => {
                return Err(QueryError::criteria(format!(
                    "json_value cannot return an empty array or object on {}",
                    on
                )));
            }
            JsonBehavior::EmptyArray => "empty array",
            JsonBehavior::EmptyObject => "empty object",
            JsonBehavior::Default(expression) => {
                self.push(" default ");
                self.render_expression(expression)?;
                self.push(&format!(" on {}", on));
                return Ok(());
            }
        };
        self.push(&format!(" {} on {}", text, on));
        Ok(())
    }

    fn render_null_clause(&mut self, nulls: JsonNullClause) {
        if nulls == JsonNullClause::AbsentOnNull {
            self.push(&format!(" {}", nulls));
        }
    }

    fn render_json(&mut self, json: &JsonExpression) -> Result<()> {
        match json {
            JsonExpression::Value {
                document,
                path,
                returning,
                on_empty,
                on_error,
            } => {
                self.push("json_value(");
                self.render_expression(document)?;
                self.push(&format!(", {}", Literal::String(path.clone())));
                if let Some(returning) = returning {
                    self.push(&format!(" returning {}", returning));
                }
                self.render_json_behavior(on_empty, "empty", false)?;
                self.render_json_behavior(on_error, "error", false)?;
                self.push(")");
            }
            JsonExpression::Query {
                document,
                path,
                wrapper,
                on_empty,
                on_error,
            } => {
                self.push("json_query(");
                self.render_expression(document)?;
                self.push(&format!(", {}", Literal::String(path.clone())));
                if *wrapper != JsonWrapper::Without {
                    self.push(&format!(" {}", wrapper));
                }
                self.render_json_behavior(on_empty, "empty", true)?;
                self.render_json_behavior(on_error, "error", true)?;
                self.push(")");
            }
            JsonExpression::Exists {
                document,
                path,
                on_error,
            } => {
                self.push("json_exists(");
                self.render_expression(document)?;
                self.push(&format!(", {}", Literal::String(path.clone())));
                self.render_json_behavior(on_error, "error", false)?;
                self.push(")");
            }
            JsonExpression::Object { entries, nulls } => {
                self.push("json_object(");
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push(&format!("{} value ", Literal::String(key.clone())));
                    self.render_expression(value)?;
                }
                self.render_null_clause(*nulls);
                self.push(")");
            }
            JsonExpression::Array { elements, nulls } => {
                self.push("json_array(");
                self.render_expression_list(elements)?;
                self.render_null_clause(*nulls);
                self.push(")");
            }
            JsonExpression::ArrayAgg {
                value,
                nulls,
                order_by,
                filter,
            } => {
                self.push("json_arrayagg(");
                self.render_expression(value)?;
                self.render_null_clause(*nulls);
                if !order_by.is_empty() {
                    self.push(" order by ");
                    self.render_sorts(order_by)?;
                }
                self.push(")");
                self.render_filter(filter.as_ref())?;
            }
            JsonExpression::ObjectAgg {
                key,
                value,
                nulls,
                filter,
            } => {
                self.push("json_objectagg(");
                self.render_expression(key)?;
                self.push(" value ");
                self.render_expression(value)?;
                self.render_null_clause(*nulls);
                self.push(")");
                self.render_filter(filter.as_ref())?;
            }
        }
        Ok(())
    }

    fn render_xml(&mut self, xml: &XmlExpression) -> Result<()> {
        match xml {
            XmlExpression::Element {
                name,
                attributes,
                content,
            } => {
                self.push(&format!("xmlelement(name \"{}\"", name));
                if !attributes.is_empty() {
                    self.push(", xmlattributes(");
                    for (i, attribute) in attributes.iter().enumerate() {
                        if i > 0 {
                            self.push(", ");
                        }
                        self.render_expression(&attribute.value)?;
                        self.push(&format!(" as \"{}\"", attribute.name));
                    }
                    self.push(")");
                }
                for value in content {
                    self.push(", ");
                    self.render_expression(value)?;
                }
                self.push(")");
            }
            XmlExpression::Forest(values) => {
                self.push("xmlforest(");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.render_expression(&value.value)?;
                    self.push(&format!(" as \"{}\"", value.name));
                }
                self.push(")");
            }
            XmlExpression::Concat(values) => {
                self.push("xmlconcat(");
                self.render_expression_list(values)?;
                self.push(")");
            }
            XmlExpression::ProcessingInstruction { target, content } => {
                self.push(&format!("xmlpi(name \"{}\"", target));
                if let Some(content) = content {
                    self.push(", ");
                    self.render_expression(content)?;
                }
                self.push(")");
            }
            XmlExpression::Query { query, document } => {
                self.push(&format!("xmlquery({} passing ", Literal::String(query.clone())));
                self.render_expression(document)?;
                self.push(")");
            }
            XmlExpression::Exists { query, document } => {
                self.push(&format!("xmlexists({} passing ", Literal::String(query.clone())));
                self.render_expression(document)?;
                self.push(")");
            }
            XmlExpression::Agg { value, order_by } => {
                self.push("xmlagg(");
                self.render_expression(value)?;
                if !order_by.is_empty() {
                    self.push(" order by ");
                    self.render_sorts(order_by)?;
                }
                self.push(")");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::_fixtures::fixtures::metamodel;
    use crate::criteria::{
        CriteriaBuilder, CriteriaQuery, CteCriteria, CteCycleClause, Expression, FrameBound, JoinType,
        JsonBehavior, JsonExpression, Literal, NullPrecedence, QueryPart, QuerySpec, RenderedQuery, Root, SearchKind,
        Selection, SetOperator, SqlRenderer, Window, WindowFrame, XmlExpression,
    };
    use crate::parameter::{
        BindValue, OrdinalMarkerStrategy, ParameterBinding, QueryParameter, QueryParameterBindings,
        StandardMarkerStrategy,
    };
    use crate::QueryError;

    fn render(query: &CriteriaQuery) -> RenderedQuery {
        let metamodel = metamodel();
        SqlRenderer::new(&StandardMarkerStrategy, 1)
            .with_metamodel(&metamodel)
            .render(query)
            .unwrap()
    }

    fn render_unmapped(query: &CriteriaQuery) -> crate::Result<RenderedQuery> {
        SqlRenderer::new(&StandardMarkerStrategy, 1).render(query)
    }

    #[test]
    pub fn test_select_with_mapped_columns_and_parameters() {
        let cb = CriteriaBuilder::new();
        let p = cb.root_as("Person", "p").unwrap();
        let spec = QuerySpec::new()
            .select(Selection::new(p.path("name")))
            .select(Selection::aliased(p.path("address.city"), "city"))
            .from(p.clone())
            .restrict(cb.and(vec![
                cb.greater_than(p.path("age"), cb.parameter("min")),
                cb.or(vec![cb.is_null(p.path("name")), cb.like(p.path("name"), cb.literal("A%"), None)]),
            ]))
            .order_by(cb.desc(p.path("age")).nulls(NullPrecedence::Last));

        let rendered = render(&CriteriaQuery::new(spec));

        assert_eq!(
            rendered.sql,
            "select p.name, p.city as city from person p \
             where p.age > ? and (p.name is null or p.name like 'A%') \
             order by p.age desc nulls last"
        );
        assert_eq!(rendered.parameters, vec![QueryParameter::Named("min".to_string())]);
    }

    #[test]
    pub fn test_association_joins_use_mapped_columns() {
        let cb = CriteriaBuilder::new();
        let p = cb.root_as("Person", "p").unwrap();
        let employer = cb.join("p", "employer", JoinType::Left);
        let phones = cb.join("p", "phones", JoinType::Inner);
        let nicknames = cb.join("p", "nicknames", JoinType::Left);
        let spec = QuerySpec::new()
            .select(Selection::new(employer.path("name")))
            .select(Selection::new(phones.path("number")))
            .select(Selection::new(nicknames.path("element")))
            .from(
                p.with_join(employer.clone().on(cb.equal(employer.path("name"), cb.literal("ACME"))))
                    .with_join(phones.clone())
                    .with_join(nicknames.clone()),
            );

        let rendered = render(&CriteriaQuery::new(spec));

        assert_eq!(
            rendered.sql,
            "select alias_1.name, alias_2.number, alias_3.nickname from person p \
             left join company alias_1 on alias_1.id = p.employer_id and alias_1.name = 'ACME' \
             join phone alias_2 on alias_2.person_id = p.id \
             left join person_nicknames alias_3 on alias_3.person_id = p.id"
        );
    }

    #[test]
    pub fn test_unsupported_joins() {
        let metamodel = metamodel();
        let cb = CriteriaBuilder::new();

        let via_join_table = Root::new(crate::criteria::FromSource::Entity("Order".to_string()), "o")
            .with_join(cb.join("o", "customer", JoinType::Inner));
        let query = CriteriaQuery::new(QuerySpec::new().from(via_join_table));
        let result = SqlRenderer::new(&StandardMarkerStrategy, 1)
            .with_metamodel(&metamodel)
            .render(&query);
        assert!(matches!(result, Err(QueryError::UnsupportedOperation(_))));

        let root = cb.root_as("Person", "p").unwrap().with_join(cb.join("p", "employer", JoinType::Inner));
        let result = render_unmapped(&CriteriaQuery::new(QuerySpec::new().from(root)));
        assert!(matches!(result, Err(QueryError::UnsupportedOperation(_))));
    }

    #[test]
    pub fn test_entity_join_requires_condition() {
        let cb = CriteriaBuilder::new();
        let company = cb.entity_join("Company", JoinType::Inner).unwrap();
        let root = cb.root_as("Person", "p").unwrap().with_join(company);

        let result = render_unmapped(&CriteriaQuery::new(QuerySpec::new().from(root)));

        assert!(matches!(result, Err(QueryError::Criteria(_))));
    }

    #[test]
    pub fn test_unknown_and_composite_paths() {
        let cb = CriteriaBuilder::new();
        let p = cb.root_as("Person", "p").unwrap();

        let unknown_alias = CriteriaQuery::new(
            QuerySpec::new()
                .select(Selection::new(Expression::path("x", "name")))
                .from(p.clone()),
        );
        assert!(matches!(render_unmapped(&unknown_alias), Err(QueryError::Criteria(_))));

        let metamodel = metamodel();
        let composite = CriteriaQuery::new(QuerySpec::new().select(Selection::new(p.path("address"))).from(p));
        let result = SqlRenderer::new(&StandardMarkerStrategy, 1)
            .with_metamodel(&metamodel)
            .render(&composite);
        assert!(matches!(result, Err(QueryError::Criteria(_))));
    }

    #[test]
    pub fn test_subquery_sees_outer_aliases() {
        let cb = CriteriaBuilder::new();
        let p = cb.root_as("Person", "p").unwrap();
        let ph = cb.root_as("Phone", "ph").unwrap();
        let sub = QuerySpec::new()
            .select(Selection::new(cb.literal(1)))
            .from(ph.clone())
            .restrict(cb.equal(ph.path("id"), p.path("id")));
        let spec = QuerySpec::new()
            .select(Selection::new(p.path("id")))
            .from(p.clone())
            .restrict(cb.not(cb.exists(sub)));

        let rendered = render(&CriteriaQuery::new(spec));

        assert_eq!(
            rendered.sql,
            "select p.id from person p where not exists (select 1 from phone ph where ph.id = p.id)"
        );
    }

    #[test]
    pub fn test_set_operation_and_row_window() {
        let cb = CriteriaBuilder::new();
        let left = QuerySpec::new().select(Selection::new(cb.literal(1)));
        let right = QuerySpec::new()
            .select(Selection::new(cb.literal(2)))
            .order_by(cb.asc(cb.literal(1)))
            .fetch(cb.literal(1));
        let body = QueryPart::combine(SetOperator::UnionAll, left.into(), right.into()).unwrap();
        let query = CriteriaQuery::new(body).offset(cb.positional(1)).fetch(cb.positional(2));

        let rendered = render_unmapped(&query).unwrap();

        assert_eq!(
            rendered.sql,
            "select 1 union all (select 2 order by 1 asc fetch first 1 rows only) offset ? rows fetch first ? rows only"
        );
        assert_eq!(rendered.parameters, vec![QueryParameter::Ordinal(1), QueryParameter::Ordinal(2)]);
    }

    #[test]
    pub fn test_recursive_cte_with_search_and_cycle() {
        let cb = CriteriaBuilder::new();
        let definition = QuerySpec::new()
            .select(Selection::new(cb.literal(1)))
            .select(Selection::new(cb.null_literal()));
        let cte = CteCriteria::new("tree", &["id", "parent"], definition.into())
            .unwrap()
            .recursive()
            .search(SearchKind::DepthFirst, &["id"], "ord")
            .unwrap()
            .cycle(CteCycleClause::new(&["id"], "is_cycle").using_path("path"))
            .unwrap();
        let t = cb.cte_root(&cte);
        let spec = QuerySpec::new()
            .select(Selection::new(t.path("id")))
            .from(t.clone())
            .order_by(cb.asc(t.path("ord")));
        let query = CriteriaQuery::new(spec).with_cte(cte).unwrap();

        let rendered = render(&query);

        assert_eq!(
            rendered.sql,
            "with recursive tree (id, parent) as (select 1, null) \
             search depth first by id set ord cycle id set is_cycle to true default false using path \
             select alias_1.id from tree alias_1 order by alias_1.ord asc"
        );
    }

    #[test]
    pub fn test_cte_root_must_exist() {
        let cb = CriteriaBuilder::new();
        let definition = QuerySpec::new().select(Selection::new(cb.literal(1)));
        let cte = CteCriteria::new("nums", &["n"], definition.into()).unwrap();
        let query = CriteriaQuery::new(QuerySpec::new().from(cb.cte_root(&cte)));

        assert!(matches!(render_unmapped(&query), Err(QueryError::Criteria(_))));
    }

    #[test]
    pub fn test_window_function() {
        let cb = CriteriaBuilder::new();
        let p = cb.root_as("Person", "p").unwrap();
        let window = Window::new()
            .partition_by(p.path("name"))
            .order_by(cb.asc(p.path("age")))
            .frame(WindowFrame::rows(FrameBound::UnboundedPreceding, FrameBound::CurrentRow).unwrap());
        let spec = QuerySpec::new()
            .select(Selection::new(cb.window_function("sum", vec![p.path("age")], window)))
            .from(p);

        let rendered = render(&CriteriaQuery::new(spec));

        assert_eq!(
            rendered.sql,
            "select sum(p.age) over (partition by p.name order by p.age asc \
             rows between unbounded preceding and current row) from person p"
        );
    }

    #[test]
    pub fn test_json_and_xml_functions() {
        let cb = CriteriaBuilder::new();
        let doc = cb.parameter("doc");
        let spec = QuerySpec::new()
            .select(Selection::new(cb.json(
                JsonExpression::value(doc.clone(), "$.age")
                    .returning("integer")
                    .on_empty(JsonBehavior::Default(cb.literal(0)))
                    .on_error(JsonBehavior::Null),
            )))
            .select(Selection::new(cb.json(
                JsonExpression::object(vec![("a", cb.literal(1)), ("b", cb.null_literal())]).absent_on_null(),
            )))
            .select(Selection::new(cb.xml(
                XmlExpression::element("item")
                    .unwrap()
                    .attribute("id", cb.literal(7))
                    .unwrap()
                    .content(cb.literal("x"))
                    .unwrap(),
            )))
            .select(Selection::new(cb.xml(XmlExpression::query("/a", doc))));

        let rendered = render_unmapped(&CriteriaQuery::new(spec)).unwrap();

        assert_eq!(
            rendered.sql,
            "select json_value(?, '$.age' returning integer default 0 on empty null on error), \
             json_object('a' value 1, 'b' value null absent on null), \
             xmlelement(name \"item\", xmlattributes(7 as \"id\"), 'x'), \
             xmlquery('/a' passing ?)"
        );
        assert_eq!(rendered.parameters.len(), 2);
    }

    #[test]
    pub fn test_json_value_rejects_empty_behaviors() {
        let cb = CriteriaBuilder::new();
        let spec = QuerySpec::new().select(Selection::new(cb.json(
            JsonExpression::value(cb.literal("{}"), "$.a").on_error(JsonBehavior::EmptyArray),
        )));

        assert!(matches!(
            render_unmapped(&CriteriaQuery::new(spec)),
            Err(QueryError::Criteria(_))
        ));
    }

    #[test]
    pub fn test_empty_junctions_and_in_lists() {
        let cb = CriteriaBuilder::new();
        let spec = QuerySpec::new()
            .select(Selection::new(cb.literal(1)))
            .restrict(cb.or(vec![
                cb.in_list(cb.literal(1), vec![]),
                cb.not(cb.in_list(cb.literal(2), vec![])),
            ]));

        let rendered = render_unmapped(&CriteriaQuery::new(spec)).unwrap();

        assert_eq!(rendered.sql, "select 1 where 1=0 or 1=1");
    }

    #[test]
    pub fn test_infinite_literal_is_rejected() {
        let infinite = ordered_float::NotNan::new(f64::INFINITY).unwrap();
        let spec = QuerySpec::new().select(Selection::new(Expression::Literal(Literal::Float(infinite))));

        assert!(matches!(
            render_unmapped(&CriteriaQuery::new(spec)),
            Err(QueryError::Criteria(_))
        ));
    }

    #[test]
    pub fn test_constant_conditions_are_folded() {
        let cb = CriteriaBuilder::new();
        let p = cb.root_as("Person", "p").unwrap();
        let adult = cb.greater_than(p.path("age"), cb.literal(17));

        let spec = QuerySpec::new()
            .select(Selection::new(p.path("name")))
            .from(p.clone())
            .restrict(cb.and(vec![cb.conjunction(), adult.clone(), cb.or(vec![])]).not())
            .group_by(p.path("name"))
            .having(cb.or(vec![cb.disjunction(), cb.and(vec![])]));
        let rendered = render(&CriteriaQuery::new(spec));
        assert_eq!(rendered.sql, "select p.name from person p group by p.name");

        let spec = QuerySpec::new()
            .select(Selection::new(p.path("name")))
            .from(p.clone())
            .restrict(cb.and(vec![cb.conjunction(), adult]));
        let rendered = render(&CriteriaQuery::new(spec));
        assert_eq!(rendered.sql, "select p.name from person p where p.age > 17");

        let spec = QuerySpec::new()
            .select(Selection::new(p.path("name")))
            .from(p)
            .restrict(cb.disjunction());
        let rendered = render(&CriteriaQuery::new(spec));
        assert_eq!(rendered.sql, "select p.name from person p where 1=0");
    }

    #[test]
    pub fn test_ordinal_markers_and_binding() {
        let cb = CriteriaBuilder::new();
        let spec = QuerySpec::new()
            .select(Selection::new(cb.parameter("a")))
            .restrict(cb.between(cb.parameter("b"), cb.parameter("a"), cb.literal(3)));
        let rendered = SqlRenderer::new(&OrdinalMarkerStrategy::default(), 1)
            .render(&CriteriaQuery::new(spec))
            .unwrap();
        assert_eq!(rendered.sql, "select $1 where $2 between $3 and 3");

        let mut bindings = QueryParameterBindings::new();
        bindings.bind(QueryParameter::Named("a".to_string()), ParameterBinding::Single(BindValue::Int(1)));
        bindings.bind(QueryParameter::Named("b".to_string()), ParameterBinding::Single(BindValue::Int(2)));
        let jdbc = rendered.bind(&bindings).unwrap();
        assert_eq!(
            jdbc.values(),
            vec![&BindValue::Int(1), &BindValue::Int(2), &BindValue::Int(1)]
        );
        assert_eq!(jdbc.0[2].position, 3);

        bindings.bind(
            QueryParameter::Named("b".to_string()),
            ParameterBinding::Multi(vec![BindValue::Int(2)]),
        );
        assert!(matches!(rendered.bind(&bindings), Err(QueryError::ParameterBinding(_))));
    }
}
