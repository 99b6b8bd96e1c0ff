use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use bson::{Bson, Document};
use regex::Regex;

use super::SqlError;
use super::ast::{
    BinaryOp, Expr, FromClause, JoinClause, PathSegment, Projection, SelectItem, SelectStmt,
    Source, UnaryOp,
};
use crate::store::Parameter;

/// `None` is the store's `undefined`: a missing property or a meaningless
/// comparison. Rows whose filter is not exactly `true` are dropped.
type Value = Option<Bson>;

/// Bound names (container alias and join bindings) for one candidate row.
type Env = Vec<(String, Bson)>;

pub(crate) fn execute(
    stmt: &SelectStmt,
    items: &[Document],
    params: &[Parameter],
) -> Result<Vec<Document>, SqlError> {
    Context { params }.select(stmt, items)
}

struct Context<'a> {
    params: &'a [Parameter],
}

impl Context<'_> {
    fn select(&self, stmt: &SelectStmt, items: &[Document]) -> Result<Vec<Document>, SqlError> {
        let mut rows = self.source_rows(&stmt.from, items)?;

        for join in &stmt.joins {
            rows = match join {
                JoinClause::In { binding, path } => {
                    let mut joined = Vec::new();
                    for env in rows {
                        if let Some(Bson::Array(elems)) = self.eval(path, &env)? {
                            for elem in elems {
                                let mut next = env.clone();
                                next.push((binding.clone(), elem));
                                joined.push(next);
                            }
                        }
                    }
                    joined
                }
                JoinClause::Filter(expr) => self.retain(rows, expr)?,
            };
        }

        if let Some(filter) = &stmt.filter {
            rows = self.retain(rows, filter)?;
        }

        let aggregated = !stmt.group_by.is_empty()
            || matches!(&stmt.projection, Projection::Items(items)
                if items.iter().any(|i| i.expr.contains_aggregate()));

        let mut docs = if aggregated {
            if !stmt.order_by.is_empty() {
                return Err(SqlError::Unsupported(
                    "ORDER BY together with aggregates".into(),
                ));
            }
            self.project_groups(stmt, rows)?
        } else {
            if !stmt.order_by.is_empty() {
                rows = self.sort(rows, &stmt.order_by)?;
            }
            let has_joins = !stmt.joins.is_empty();
            rows.iter()
                .map(|env| self.project(&stmt.projection, env, has_joins))
                .collect::<Result<Vec<_>, _>>()?
        };

        if stmt.distinct {
            let mut seen = HashSet::new();
            docs.retain(|doc| seen.insert(format!("{doc:?}")));
        }

        if let Some((offset, limit)) = &stmt.offset_limit {
            let offset = self.count_arg(offset)?;
            let limit = self.count_arg(limit)?;
            docs = docs.into_iter().skip(offset).take(limit).collect();
        }

        Ok(docs)
    }

    fn source_rows(&self, from: &FromClause, items: &[Document]) -> Result<Vec<Env>, SqlError> {
        let docs = match &from.source {
            Source::Container(_) => items.to_vec(),
            Source::Subquery(inner) => self.select(inner, items)?,
        };
        Ok(docs
            .into_iter()
            .map(|doc| vec![(from.alias.clone(), Bson::Document(doc))])
            .collect())
    }

    fn retain(&self, rows: Vec<Env>, filter: &Expr) -> Result<Vec<Env>, SqlError> {
        let mut kept = Vec::with_capacity(rows.len());
        for env in rows {
            if self.eval(filter, &env)? == Some(Bson::Boolean(true)) {
                kept.push(env);
            }
        }
        Ok(kept)
    }

    fn sort(&self, rows: Vec<Env>, order_by: &[(Expr, bool)]) -> Result<Vec<Env>, SqlError> {
        let mut keyed = Vec::with_capacity(rows.len());
        for env in rows {
            let keys = order_by
                .iter()
                .map(|(expr, _)| self.eval(expr, &env))
                .collect::<Result<Vec<_>, _>>()?;
            keyed.push((keys, env));
        }
        keyed.sort_by(|(a, _), (b, _)| {
            for (i, (_, descending)) in order_by.iter().enumerate() {
                let ord = order_cmp(&a[i], &b[i]);
                let ord = if *descending { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        Ok(keyed.into_iter().map(|(_, env)| env).collect())
    }

    fn count_arg(&self, expr: &Expr) -> Result<usize, SqlError> {
        match self.eval(expr, &Vec::new())? {
            Some(Bson::Int32(n)) if n >= 0 => Ok(n as usize),
            Some(Bson::Int64(n)) if n >= 0 => Ok(n as usize),
            other => Err(SqlError::Syntax(format!(
                "OFFSET and LIMIT take non-negative integers, got {other:?}"
            ))),
        }
    }

    // ── Projection ──────────────────────────────────────────────

    fn project(
        &self,
        projection: &Projection,
        env: &Env,
        has_joins: bool,
    ) -> Result<Document, SqlError> {
        let items = match projection {
            Projection::Star if has_joins => {
                return Ok(env.iter().cloned().collect());
            }
            Projection::Star => {
                return Ok(match env.first() {
                    Some((_, Bson::Document(doc))) => doc.clone(),
                    Some((_, other)) => bson::doc! { "$1": other.clone() },
                    None => Document::new(),
                });
            }
            Projection::Items(items) => items,
        };

        let mut doc = Document::new();
        for (name, item) in output_names(items).into_iter().zip(items) {
            if let Some(value) = self.eval(&item.expr, env)? {
                doc.insert(name, value);
            }
        }
        Ok(doc)
    }

    fn project_groups(&self, stmt: &SelectStmt, rows: Vec<Env>) -> Result<Vec<Document>, SqlError> {
        let Projection::Items(items) = &stmt.projection else {
            return Err(SqlError::Unsupported("SELECT * with GROUP BY".into()));
        };

        let mut groups: Vec<Vec<Env>> = Vec::new();
        if stmt.group_by.is_empty() {
            groups.push(rows);
        } else {
            let mut index: HashMap<String, usize> = HashMap::new();
            for env in rows {
                let key = stmt
                    .group_by
                    .iter()
                    .map(|expr| self.eval(expr, &env))
                    .collect::<Result<Vec<_>, _>>()?;
                let key = format!("{key:?}");
                match index.get(&key) {
                    Some(&i) => groups[i].push(env),
                    None => {
                        index.insert(key, groups.len());
                        groups.push(vec![env]);
                    }
                }
            }
        }

        let names = output_names(items);
        let mut docs = Vec::with_capacity(groups.len());
        for group in &groups {
            let mut doc = Document::new();
            for (name, item) in names.iter().zip(items) {
                if let Some(value) = self.eval_group(&item.expr, group)? {
                    doc.insert(name.clone(), value);
                }
            }
            docs.push(doc);
        }
        Ok(docs)
    }

    // ── Expressions ─────────────────────────────────────────────

    fn eval(&self, expr: &Expr, env: &Env) -> Result<Value, SqlError> {
        match expr {
            Expr::Literal(value) => Ok(Some(value.clone())),
            Expr::Undefined => Ok(None),
            Expr::Param(name) => self
                .params
                .iter()
                .find(|p| p.name == *name)
                .map(|p| Some(p.value.clone()))
                .ok_or_else(|| SqlError::MissingParam(name.clone())),
            Expr::Path { root, segments } => resolve(env, root, segments),
            Expr::Unary(op, inner) => Ok(unary(*op, self.eval(inner, env)?)),
            Expr::Binary(op, lhs, rhs) => {
                Ok(binary(*op, self.eval(lhs, env)?, self.eval(rhs, env)?))
            }
            Expr::In {
                expr,
                list,
                negated,
            } => {
                let needle = self.eval(expr, env)?;
                let candidates = list
                    .iter()
                    .map(|e| self.eval(e, env))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(in_list(needle, &candidates, *negated))
            }
            Expr::Call { name, args, .. } => {
                if expr.is_aggregate_call() {
                    return Err(SqlError::Unsupported(format!(
                        "{name} outside of a projection"
                    )));
                }
                let args = args
                    .iter()
                    .map(|e| self.eval(e, env))
                    .collect::<Result<Vec<_>, _>>()?;
                scalar_call(name, args)
            }
        }
    }

    fn eval_group(&self, expr: &Expr, group: &[Env]) -> Result<Value, SqlError> {
        if !expr.contains_aggregate() {
            return match group.first() {
                Some(env) => self.eval(expr, env),
                None => Ok(None),
            };
        }
        match expr {
            Expr::Call {
                name,
                args,
                distinct,
            } if expr.is_aggregate_call() => self.aggregate(name, args, *distinct, group),
            Expr::Call { name, args, .. } => {
                let args = args
                    .iter()
                    .map(|e| self.eval_group(e, group))
                    .collect::<Result<Vec<_>, _>>()?;
                scalar_call(name, args)
            }
            Expr::Unary(op, inner) => Ok(unary(*op, self.eval_group(inner, group)?)),
            Expr::Binary(op, lhs, rhs) => Ok(binary(
                *op,
                self.eval_group(lhs, group)?,
                self.eval_group(rhs, group)?,
            )),
            Expr::In {
                expr,
                list,
                negated,
            } => {
                let needle = self.eval_group(expr, group)?;
                let candidates = list
                    .iter()
                    .map(|e| self.eval_group(e, group))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(in_list(needle, &candidates, *negated))
            }
            Expr::Literal(_) | Expr::Undefined | Expr::Param(_) | Expr::Path { .. } => Ok(None),
        }
    }

    fn aggregate(
        &self,
        name: &str,
        args: &[Expr],
        distinct: bool,
        group: &[Env],
    ) -> Result<Value, SqlError> {
        let [arg] = args else {
            return Err(SqlError::Syntax(format!("{name} takes exactly one argument")));
        };

        let mut values = Vec::new();
        for env in group {
            if let Some(value) = self.eval(arg, env)? {
                values.push(value);
            }
        }
        if distinct {
            let mut seen = HashSet::new();
            values.retain(|v| seen.insert(format!("{v:?}")));
        }

        Ok(match name {
            "COUNT" => Some(Bson::Int64(values.len() as i64)),
            "SUM" => sum(&values),
            "AVG" => {
                let total = sum(&values);
                match (total.as_ref().and_then(number), values.len()) {
                    (_, 0) | (None, _) => None,
                    (Some(n), len) => Some(Bson::Double(n.as_f64() / len as f64)),
                }
            }
            "MIN" => values.into_iter().min_by(|a, b| order_cmp(&Some(a.clone()), &Some(b.clone()))),
            "MAX" => values.into_iter().max_by(|a, b| order_cmp(&Some(a.clone()), &Some(b.clone()))),
            other => return Err(SqlError::Unsupported(format!("aggregate {other}"))),
        })
    }
}

/// Output property names: alias, else the last path segment, else `$1`, `$2`, ...
fn output_names(items: &[SelectItem]) -> Vec<String> {
    let mut unnamed = 0;
    items
        .iter()
        .map(|item| match (&item.alias, item.expr.implicit_name()) {
            (Some(alias), _) => alias.clone(),
            (None, Some(name)) => name.to_string(),
            (None, None) => {
                unnamed += 1;
                format!("${unnamed}")
            }
        })
        .collect()
}

fn resolve(env: &Env, root: &str, segments: &[PathSegment]) -> Result<Value, SqlError> {
    let Some((_, bound)) = env.iter().rev().find(|(name, _)| name == root) else {
        return Err(SqlError::UnknownIdentifier(root.to_string()));
    };
    let mut current = bound;
    for segment in segments {
        let next = match (segment, current) {
            (PathSegment::Field(field), Bson::Document(doc)) => doc.get(field),
            (PathSegment::Index(i), Bson::Array(items)) if *i >= 0 => items.get(*i as usize),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Ok(None),
        }
    }
    Ok(Some(current.clone()))
}

// ── Value semantics ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(f) => f,
        }
    }

    fn into_bson(self) -> Bson {
        match self {
            Number::Int(n) => Bson::Int64(n),
            Number::Float(f) => Bson::Double(f),
        }
    }
}

fn number(value: &Bson) -> Option<Number> {
    match value {
        Bson::Int32(n) => Some(Number::Int(*n as i64)),
        Bson::Int64(n) => Some(Number::Int(*n)),
        Bson::Double(f) => Some(Number::Float(*f)),
        _ => None,
    }
}

fn sum(values: &[Bson]) -> Value {
    let mut total = Number::Int(0);
    if values.is_empty() {
        return None;
    }
    for value in values {
        let n = number(value)?;
        total = match (total, n) {
            (Number::Int(a), Number::Int(b)) => match a.checked_add(b) {
                Some(s) => Number::Int(s),
                None => Number::Float(a as f64 + b as f64),
            },
            (a, b) => Number::Float(a.as_f64() + b.as_f64()),
        };
    }
    Some(total.into_bson())
}

/// Rank of a value's type in the store's cross-type sort order.
fn type_rank(value: &Value) -> u8 {
    match value {
        None => 0,
        Some(Bson::Null) => 1,
        Some(Bson::Boolean(_)) => 2,
        Some(v) if number(v).is_some() => 3,
        Some(Bson::String(_)) => 4,
        Some(_) => 5,
    }
}

/// Comparison between two values of the same type; `None` across types.
fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (number(a), number(b)) {
        return match (x, y) {
            (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
            (x, y) => x.as_f64().partial_cmp(&y.as_f64()),
        };
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    match compare(a, b) {
        Some(ord) => ord == Ordering::Equal,
        None => a == b,
    }
}

fn order_cmp(a: &Value, b: &Value) -> Ordering {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

fn unary(op: UnaryOp, value: Value) -> Value {
    match (op, value) {
        (UnaryOp::Not, Some(Bson::Boolean(b))) => Some(Bson::Boolean(!b)),
        (UnaryOp::Neg, Some(v)) => match number(&v)? {
            Number::Int(n) => Some(Bson::Int64(n.checked_neg()?)),
            Number::Float(f) => Some(Bson::Double(-f)),
        },
        _ => None,
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Value {
    match op {
        BinaryOp::And => match (lhs, rhs) {
            (Some(Bson::Boolean(false)), _) | (_, Some(Bson::Boolean(false))) => {
                Some(Bson::Boolean(false))
            }
            (Some(Bson::Boolean(true)), Some(Bson::Boolean(true))) => Some(Bson::Boolean(true)),
            _ => None,
        },
        BinaryOp::Or => match (lhs, rhs) {
            (Some(Bson::Boolean(true)), _) | (_, Some(Bson::Boolean(true))) => {
                Some(Bson::Boolean(true))
            }
            (Some(Bson::Boolean(false)), Some(Bson::Boolean(false))) => {
                Some(Bson::Boolean(false))
            }
            _ => None,
        },
        BinaryOp::Eq => Some(Bson::Boolean(values_equal(&lhs?, &rhs?))),
        BinaryOp::NotEq => Some(Bson::Boolean(!values_equal(&lhs?, &rhs?))),
        BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
            let ord = compare(&lhs?, &rhs?)?;
            Some(Bson::Boolean(match op {
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::Lte => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }))
        }
        BinaryOp::Concat => match (lhs?, rhs?) {
            (Bson::String(a), Bson::String(b)) => Some(Bson::String(a + &b)),
            _ => None,
        },
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, number(&lhs?)?, number(&rhs?)?)
        }
    }
}

fn arithmetic(op: BinaryOp, a: Number, b: Number) -> Value {
    if let (Number::Int(x), Number::Int(y)) = (a, b) {
        let exact = match op {
            BinaryOp::Add => x.checked_add(y),
            BinaryOp::Sub => x.checked_sub(y),
            BinaryOp::Mul => x.checked_mul(y),
            BinaryOp::Mod => x.checked_rem(y),
            _ => None,
        };
        if let Some(n) = exact {
            return Some(Bson::Int64(n));
        }
        if op == BinaryOp::Mod {
            return None;
        }
    }
    let (x, y) = (a.as_f64(), b.as_f64());
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div if y == 0.0 => return None,
        BinaryOp::Div => x / y,
        BinaryOp::Mod if y == 0.0 => return None,
        _ => x % y,
    };
    Some(Bson::Double(result))
}

fn in_list(needle: Value, candidates: &[Value], negated: bool) -> Value {
    let needle = needle?;
    let found = candidates
        .iter()
        .flatten()
        .any(|candidate| values_equal(&needle, candidate));
    Some(Bson::Boolean(found != negated))
}

fn scalar_call(name: &str, args: Vec<Value>) -> Result<Value, SqlError> {
    let arity = |min: usize, max: usize| {
        if args.len() < min || args.len() > max {
            Err(SqlError::Syntax(format!(
                "{name} called with {} arguments",
                args.len()
            )))
        } else {
            Ok(())
        }
    };

    let result = match name {
        "LOWER" | "UPPER" => {
            arity(1, 1)?;
            match &args[0] {
                Some(Bson::String(s)) if name == "LOWER" => Some(Bson::String(s.to_lowercase())),
                Some(Bson::String(s)) => Some(Bson::String(s.to_uppercase())),
                _ => None,
            }
        }
        "LENGTH" => {
            arity(1, 1)?;
            match &args[0] {
                Some(Bson::String(s)) => Some(Bson::Int64(s.chars().count() as i64)),
                _ => None,
            }
        }
        "CONTAINS" | "STARTSWITH" | "ENDSWITH" => {
            arity(2, 3)?;
            let ignore_case = matches!(args.get(2), Some(Some(Bson::Boolean(true))));
            match (&args[0], &args[1]) {
                (Some(Bson::String(haystack)), Some(Bson::String(needle))) => {
                    let (haystack, needle) = if ignore_case {
                        (haystack.to_lowercase(), needle.to_lowercase())
                    } else {
                        (haystack.clone(), needle.clone())
                    };
                    let hit = match name {
                        "CONTAINS" => haystack.contains(&needle),
                        "STARTSWITH" => haystack.starts_with(&needle),
                        _ => haystack.ends_with(&needle),
                    };
                    Some(Bson::Boolean(hit))
                }
                _ => None,
            }
        }
        "IS_NULL" => {
            arity(1, 1)?;
            Some(Bson::Boolean(matches!(args[0], Some(Bson::Null))))
        }
        "IS_DEFINED" => {
            arity(1, 1)?;
            Some(Bson::Boolean(args[0].is_some()))
        }
        "REGEXMATCH" => {
            arity(2, 3)?;
            let flags = match args.get(2) {
                Some(Some(Bson::String(f))) => f
                    .chars()
                    .filter(|c| matches!(c, 'i' | 'm' | 's' | 'x'))
                    .collect::<String>(),
                _ => String::new(),
            };
            match (&args[0], &args[1]) {
                (Some(Bson::String(text)), Some(Bson::String(pattern))) => {
                    let pattern = if flags.is_empty() {
                        pattern.clone()
                    } else {
                        format!("(?{flags}){pattern}")
                    };
                    Some(Bson::Boolean(Regex::new(&pattern)?.is_match(text)))
                }
                _ => None,
            }
        }
        "CONCAT" => {
            let mut out = String::new();
            for arg in &args {
                match arg {
                    Some(Bson::String(s)) => out.push_str(s),
                    _ => return Ok(None),
                }
            }
            Some(Bson::String(out))
        }
        other => return Err(SqlError::Unsupported(format!("function {other}"))),
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;
    use crate::memory::sql::parser::parse;

    fn run(sql: &str, items: &[Document], params: &[Parameter]) -> Vec<Document> {
        execute(&parse(sql).unwrap(), items, params).unwrap()
    }

    fn books() -> Vec<Document> {
        vec![
            doc! { "id": "1", "title": "Dune", "pages": 412, "genre": "scifi" },
            doc! { "id": "2", "title": "Emma", "pages": 320, "genre": "classic" },
            doc! { "id": "3", "title": "Ubik", "pages": 202, "genre": "scifi" },
            doc! { "id": "4", "title": "Ulysses", "genre": "classic", "pages": Bson::Null },
        ]
    }

    #[test]
    fn filter_with_params_and_order() {
        let params = vec![Parameter {
            name: "@arg0".into(),
            value: Bson::Int32(300),
        }];
        let rows = run(
            "SELECT book.title FROM book WHERE book.pages > @arg0 ORDER BY book.pages DESC",
            &books(),
            &params,
        );
        assert_eq!(rows, vec![doc! { "title": "Dune" }, doc! { "title": "Emma" }]);
    }

    #[test]
    fn cross_type_comparison_filters_out() {
        let rows = run("SELECT book.id FROM book WHERE book.pages < 1000", &books(), &[]);
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn string_functions_and_case_folding() {
        let rows = run(
            "SELECT book.id FROM book WHERE STARTSWITH(book.title, 'u', true)",
            &books(),
            &[],
        );
        assert_eq!(rows, vec![doc! { "id": "3" }, doc! { "id": "4" }]);
    }

    #[test]
    fn grouped_aggregates() {
        let rows = run(
            "SELECT book.genre, COUNT(1) AS n FROM book GROUP BY book.genre",
            &books(),
            &[],
        );
        assert_eq!(
            rows,
            vec![
                doc! { "genre": "scifi", "n": 2_i64 },
                doc! { "genre": "classic", "n": 2_i64 },
            ]
        );
    }

    #[test]
    fn aggregate_over_empty_input() {
        let rows = run(
            "SELECT COUNT(1), SUM(book.pages) FROM book WHERE book.id = 'none'",
            &[],
            &[],
        );
        assert_eq!(rows, vec![doc! { "$1": 0_i64 }]);
    }

    #[test]
    fn join_in_expands_arrays() {
        let items = vec![
            doc! { "id": "a1", "name": "Le Guin", "books": [ { "t": "Lathe" }, { "t": "Dispossessed" } ] },
            doc! { "id": "a2", "name": "Nobody", "books": [] },
        ];
        let rows = run(
            "SELECT author.name, b.t FROM author JOIN b IN author.books",
            &items,
            &[],
        );
        assert_eq!(
            rows,
            vec![
                doc! { "name": "Le Guin", "t": "Lathe" },
                doc! { "name": "Le Guin", "t": "Dispossessed" },
            ]
        );
    }

    #[test]
    fn offset_limit_and_distinct() {
        let rows = run(
            "SELECT DISTINCT book.genre FROM book OFFSET 1 LIMIT 5",
            &books(),
            &[],
        );
        assert_eq!(rows, vec![doc! { "genre": "classic" }]);
    }

    #[test]
    fn unknown_identifier_errors() {
        let stmt = parse("SELECT other.id FROM book").unwrap();
        assert!(matches!(
            execute(&stmt, &books(), &[]),
            Err(SqlError::UnknownIdentifier(_))
        ));
    }

    #[test]
    fn missing_parameter_errors() {
        let stmt = parse("SELECT * FROM book WHERE book.id = @arg3").unwrap();
        assert!(matches!(
            execute(&stmt, &books(), &[]),
            Err(SqlError::MissingParam(_))
        ));
    }
}
