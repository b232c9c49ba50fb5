//! Compile-once, render-many template trees

use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;

use super::expression::{Expression, UndefinedBehavior};
use super::types::{
    Bindings, PathSegment, RenderedDocument, TemplateDocument, TemplateError, TemplatePath,
    TemplateResult,
};

/// A template document whose leaves have been parsed into expressions.
///
/// Immutable once built, so a single instance can be rendered concurrently
/// from any number of threads against independent bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledTemplate {
    Scalar(Expression),
    Sequence(Vec<CompiledTemplate>),
    Mapping(BTreeMap<String, CompiledTemplate>),
}

/// Compile a template document, reporting the path of the first bad leaf
pub fn compile(doc: TemplateDocument) -> TemplateResult<CompiledTemplate> {
    let mut path = TemplatePath::root();
    let compiled = compile_node(doc, &mut path)?;
    tracing::debug!(leaves = compiled.leaf_count(), "Template compiled");
    Ok(compiled)
}

fn compile_node(doc: TemplateDocument, path: &mut TemplatePath) -> TemplateResult<CompiledTemplate> {
    match doc {
        TemplateDocument::Scalar(source) => Expression::parse(&source)
            .map(CompiledTemplate::Scalar)
            .map_err(|e| TemplateError::Syntax {
                path: path.clone(),
                offset: e.offset,
                message: e.message,
            }),
        TemplateDocument::Sequence(items) => {
            let mut compiled = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                path.push(PathSegment::Index(index));
                compiled.push(compile_node(item, path)?);
                path.pop();
            }
            Ok(CompiledTemplate::Sequence(compiled))
        }
        TemplateDocument::Mapping(map) => {
            let mut compiled = BTreeMap::new();
            for (key, item) in map {
                path.push(PathSegment::Key(key.clone()));
                let node = compile_node(item, path)?;
                path.pop();
                compiled.insert(key, node);
            }
            Ok(CompiledTemplate::Mapping(compiled))
        }
    }
}

impl CompiledTemplate {
    /// Convert and compile a raw JSON template in one step
    pub fn from_json(value: serde_json::Value) -> TemplateResult<Self> {
        compile(TemplateDocument::from_json(value)?)
    }

    /// Render with lenient undefined handling. Cannot fail.
    pub fn render(&self, bindings: &Bindings) -> RenderedDocument {
        let mut path = TemplatePath::root();
        let rendered = self.map_leaves(&mut path, &mut |_, expr| {
            Ok::<_, Infallible>(expr.render(bindings))
        });
        match rendered {
            Ok(doc) => doc,
            Err(never) => match never {},
        }
    }

    /// Render with the given undefined-variable behaviour
    pub fn render_with(
        &self,
        bindings: &Bindings,
        undefined: UndefinedBehavior,
    ) -> TemplateResult<RenderedDocument> {
        match undefined {
            UndefinedBehavior::Lenient => Ok(self.render(bindings)),
            UndefinedBehavior::Strict => {
                let mut path = TemplatePath::root();
                self.map_leaves(&mut path, &mut |path, expr| {
                    expr.render_strict(bindings)
                        .map_err(|e| TemplateError::Render {
                            path: path.clone(),
                            message: e.to_string(),
                        })
                })
            }
        }
    }

    /// Root names of every variable referenced anywhere in the tree
    pub fn variables(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.for_each_leaf(&mut |expr| {
            names.extend(expr.variables().map(|v| v.root().to_string()));
        });
        names
    }

    /// Number of string leaves in the tree
    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        self.for_each_leaf(&mut |_| count += 1);
        count
    }

    fn for_each_leaf(&self, f: &mut impl FnMut(&Expression)) {
        match self {
            CompiledTemplate::Scalar(expr) => f(expr),
            CompiledTemplate::Sequence(items) => {
                for item in items {
                    item.for_each_leaf(f);
                }
            }
            CompiledTemplate::Mapping(map) => {
                for item in map.values() {
                    item.for_each_leaf(f);
                }
            }
        }
    }

    fn map_leaves<E>(
        &self,
        path: &mut TemplatePath,
        f: &mut impl FnMut(&TemplatePath, &Expression) -> Result<String, E>,
    ) -> Result<RenderedDocument, E> {
        match self {
            CompiledTemplate::Scalar(expr) => f(path, expr).map(RenderedDocument::Scalar),
            CompiledTemplate::Sequence(items) => {
                let mut rendered = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    path.push(PathSegment::Index(index));
                    rendered.push(item.map_leaves(path, f)?);
                    path.pop();
                }
                Ok(RenderedDocument::Sequence(rendered))
            }
            CompiledTemplate::Mapping(map) => {
                let mut rendered = BTreeMap::new();
                for (key, item) in map {
                    path.push(PathSegment::Key(key.clone()));
                    let node = item.map_leaves(path, f)?;
                    path.pop();
                    rendered.insert(key.clone(), node);
                }
                Ok(RenderedDocument::Mapping(rendered))
            }
        }
    }
}

impl TryFrom<TemplateDocument> for CompiledTemplate {
    type Error = TemplateError;

    fn try_from(doc: TemplateDocument) -> TemplateResult<Self> {
        compile(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(value: serde_json::Value) -> Bindings {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("bindings fixture must be an object"),
        }
    }

    fn key_path(keys: &[&str]) -> TemplatePath {
        keys.iter().copied().collect()
    }

    #[test]
    fn test_nested_substitution() {
        let template = CompiledTemplate::from_json(json!({
            "foo": "{{foo}}",
            "nested": {"bar": "This is {{bar}}"},
            "list": ["{{foo}}", "{{bar}}", "GROO"]
        }))
        .unwrap();

        let rendered = template.render(&vars(json!({"foo": "FOO", "bar": "BAR"})));

        assert_eq!(
            serde_json::Value::from(rendered),
            json!({
                "foo": "FOO",
                "nested": {"bar": "This is BAR"},
                "list": ["FOO", "BAR", "GROO"]
            })
        );
    }

    #[test]
    fn test_scalar_noop() {
        let template = compile("Nothing here".into()).unwrap();
        let rendered = template.render(&vars(json!({"foo": "FOO"})));
        assert_eq!(rendered, RenderedDocument::Scalar("Nothing here".to_string()));
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let template = compile("{{missing}}".into()).unwrap();
        assert_eq!(
            template.render(&Bindings::new()),
            RenderedDocument::Scalar(String::new())
        );
    }

    #[test]
    fn test_syntax_error_reports_path() {
        let err = CompiledTemplate::from_json(json!({"a": {"b": "{{unterminated"}})).unwrap_err();
        match err {
            TemplateError::Syntax { path, offset, .. } => {
                assert_eq!(path, key_path(&["a", "b"]));
                assert_eq!(offset, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_syntax_error_in_sequence() {
        let err = CompiledTemplate::from_json(json!({"list": ["ok", "bad }}"]})).unwrap_err();
        let expected: TemplatePath = [PathSegment::from("list"), PathSegment::Index(1)]
            .into_iter()
            .collect();
        assert_eq!(err.path(), Some(&expected));
        assert_eq!(
            err.to_string(),
            "Template syntax error at list[1] (offset 4): unbalanced `}}` without matching `{{`"
        );
    }

    #[test]
    fn test_unsupported_shape() {
        let err = CompiledTemplate::from_json(json!({"a": 42})).unwrap_err();
        assert!(matches!(
            &err,
            TemplateError::UnsupportedShape { path, found: "number" } if *path == key_path(&["a"])
        ));
    }

    #[test]
    fn test_strict_render_reports_leaf_path() {
        let template = CompiledTemplate::from_json(json!({
            "subject": "Hi {{name}}",
            "lines": ["{{name}}", "{{order_id}}"]
        }))
        .unwrap();

        let err = template
            .render_with(&vars(json!({"name": "Ann"})), UndefinedBehavior::Strict)
            .unwrap_err();
        let expected: TemplatePath = [PathSegment::from("lines"), PathSegment::Index(1)]
            .into_iter()
            .collect();
        assert!(matches!(&err, TemplateError::Render { path, .. } if *path == expected));
        assert!(err.to_string().contains("undefined variable `order_id`"));
    }

    #[test]
    fn test_strict_render_success_matches_lenient() {
        let template = CompiledTemplate::from_json(json!(["{{a}}", {"b": "{{a}}!"}])).unwrap();
        let bindings = vars(json!({"a": 1}));
        assert_eq!(
            template.render_with(&bindings, UndefinedBehavior::Strict).unwrap(),
            template.render(&bindings)
        );
    }

    #[test]
    fn test_variables_and_leaf_count() {
        let template = CompiledTemplate::from_json(json!({
            "subject": "{{ user.name }} ordered {{count}}",
            "body": ["static", "{{count}}"]
        }))
        .unwrap();
        assert_eq!(template.leaf_count(), 3);
        let names: Vec<_> = template.variables().into_iter().collect();
        assert_eq!(names, vec!["count", "user"]);
    }

    #[test]
    fn test_empty_containers_preserved() {
        let template = CompiledTemplate::from_json(json!({"a": [], "b": {}})).unwrap();
        assert_eq!(
            serde_json::Value::from(template.render(&Bindings::new())),
            json!({"a": [], "b": {}})
        );
    }

    #[test]
    fn test_compiled_template_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledTemplate>();
    }
}
