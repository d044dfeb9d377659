//! Script-document scanners: class, mixin, behavior, function, and
//! namespace recognition over an ECMAScript module.
//!
//! Each scanner walks the module's *top-level* statements only (module body,
//! not into function/arrow bodies). That is deliberate, not an
//! oversimplification: a mixin factory's returned class lives inside the
//! factory function's body, so restricting the class scanner to top-level
//! bindings is what gives "the mixin path wins" for free — the inner
//! class is simply never visible to it, so no duplicate class feature is
//! ever emitted for it.

use swc_common::comments::SingleThreadedComments;
use swc_common::{Span, Spanned};
use swc_ecma_ast::{
    ArrayLit, ArrowExpr, AssignTarget, CallExpr, Callee, Class, ClassMember, Decl, Expr,
    ExprOrSpread, Function, Lit, MemberExpr, MemberProp, ModuleDecl, ModuleItem, ObjectLit, Pat,
    Prop, PropName, PropOrSpread, SimpleAssignTarget, Stmt, VarDeclarator,
};

use crate::ast::ScriptDocument;
use crate::feature::{
    AttributeMember, ClassLikeFeature, ClassLikeKind, EventMember, FunctionFeature, MethodMember,
    NamespaceFeature, PropertyMember, ScannedFeature,
};
use crate::jsdoc::JsDoc;
use crate::parser::ParsedDocument;
use crate::privacy::{changed_event_name, get_or_infer_privacy, property_name_to_attribute_name};
use crate::warning::SourceRange;

use super::Scanner;

/// The shape a top-level binding's initializer/right-hand side took, enough
/// to decide which scanner (if any) should claim it.
///
/// Every variant holds only shared references, so this is `Copy` — matching
/// it by value instead of by reference avoids accumulating a spurious extra
/// layer of indirection at each call site.
#[derive(Clone, Copy)]
enum BindingValue<'a> {
    Class(&'a Class),
    Function(&'a Function),
    Arrow(&'a ArrowExpr),
    Object(&'a ObjectLit),
    Array(&'a ArrayLit),
    /// A call wrapping a function/arrow, e.g.
    /// `Polymer.TestMixin = Polymer.woohoo(function TestMixin(base) {...})`.
    WrappedFunction(&'a Function),
    /// A `let`/`var` with no initializer at all. Only meaningful to the
    /// mixin scanner, which records these as empty-members mixins.
    Uninitialized,
}

/// A declaration bound to a (possibly dotted) top-level name.
struct TopLevelBinding<'a> {
    name: String,
    span: Span,
    /// The span whose start marks where a leading JSDoc comment would
    /// attach: the enclosing *statement*'s first token (`export`, `var`,
    /// `const`, `class`, `function`,...), which is not always `span`'s own
    /// start. `swc`'s comment map keys a leading comment to the position of
    /// the next token it precedes, and for e.g. `const Foo =...` that is
    /// the position of `const`, not of the `Foo` identifier a
    /// `VariableDeclarator`'s own span starts at.
    doc_span: Span,
    value: BindingValue<'a>,
}

/// A `customElements.define(tagArg, classRef)` call recognized at the top
/// level.
struct DefineCall<'a> {
    tag_literal: Option<String>,
    /// Name of an `Identifier.is`-shaped first argument's owner, used only
    /// when there is no string literal to break the tie.
    tag_from_is_owner: Option<String>,
    class_ref_name: Option<String>,
    inline_class: Option<&'a Class>,
    span: Span,
}

/// Walks `module.body`, collecting every top-level binding and
/// `customElements.define` call. Shared by all five script scanners so each
/// only has to filter, not re-walk.
fn collect_top_level<'a>(
    items: &'a [ModuleItem],
) -> (Vec<TopLevelBinding<'a>>, Vec<DefineCall<'a>>) {
    let mut bindings = Vec::new();
    let mut defines = Vec::new();

    for item in items {
        let stmt = match item {
            ModuleItem::Stmt(stmt) => stmt,
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
                collect_decl(&export.decl, export.span, &mut bindings);
                continue;
            }
            ModuleItem::ModuleDecl(_) => continue,
        };

        match stmt {
            Stmt::Decl(decl) => collect_decl(decl, stmt.span(), &mut bindings),
            Stmt::Expr(expr_stmt) => {
                if let Expr::Assign(assign) = expr_stmt.expr.as_ref() {
                    if let Some(name) = assign_target_name(&assign.left) {
                        if let Some(value) = binding_value_of(assign.right.as_ref()) {
                            bindings.push(TopLevelBinding {
                                    name,
                                    span: assign.span,
                                    doc_span: expr_stmt.span,
                                    value,
                                });
                        }
                    }
                }
                if let Expr::Call(call) = expr_stmt.expr.as_ref() {
                    if let Some(define) = define_call(call) {
                        defines.push(define);
                    }
                }
            }
            _ => {}
        }
    }

    (bindings, defines)
}

fn collect_decl<'a>(decl: &'a Decl, doc_span: Span, bindings: &mut Vec<TopLevelBinding<'a>>) {
    match decl {
        Decl::Class(class_decl) => bindings.push(TopLevelBinding {
                name: class_decl.ident.sym.to_string(),
                span: class_decl.class.span,
                doc_span,
                value: BindingValue::Class(&class_decl.class),
            }),
        Decl::Fn(fn_decl) => bindings.push(TopLevelBinding {
                name: fn_decl.ident.sym.to_string(),
                span: fn_decl.function.span,
                doc_span,
                value: BindingValue::Function(&fn_decl.function),
            }),
        Decl::Var(var_decl) => {
            for decl in &var_decl.decls {
                if let Some(binding) = binding_from_declarator(decl, doc_span) {
                    bindings.push(binding);
                }
            }
        }
        _ => {}
    }
}

fn binding_from_declarator(decl: &VarDeclarator, doc_span: Span) -> Option<TopLevelBinding<'_>> {
    let Pat::Ident(ident) = &decl.name else {
        return None;
    };
    let name = ident.id.sym.to_string();

    let Some(init) = decl.init.as_deref() else {
        // "A plain let/var with no function body yields an empty-members
        // mixin record".
        return Some(TopLevelBinding {
                name,
                span: decl.span,
                doc_span,
                value: BindingValue::Uninitialized,
            });
    };

    binding_value_of(init).map(|value| TopLevelBinding {
            name,
            span: decl.span,
            doc_span,
            value,
        })
}

fn binding_value_of(expr: &Expr) -> Option<BindingValue<'_>> {
    match expr {
        Expr::Class(class_expr) => Some(BindingValue::Class(&class_expr.class)),
        Expr::Fn(fn_expr) => Some(BindingValue::Function(&fn_expr.function)),
        Expr::Arrow(arrow) => Some(BindingValue::Arrow(arrow)),
        Expr::Object(obj) => Some(BindingValue::Object(obj)),
        Expr::Array(arr) => Some(BindingValue::Array(arr)),
        Expr::Call(call) => {
            // `Namespace.helper(function Mixin(base) {...})`: treat the
            // wrapped function/arrow argument as the binding's real value.
            call.args.first().and_then(|ExprOrSpread { expr,.. }| match expr.as_ref() {
                    Expr::Fn(fn_expr) => Some(BindingValue::WrappedFunction(&fn_expr.function)),
                    _ => None,
                })
        }
        _ => None,
    }
}

fn assign_target_name(target: &AssignTarget) -> Option<String> {
    match target {
        AssignTarget::Simple(SimpleAssignTarget::Ident(ident)) => Some(ident.id.sym.to_string()),
        AssignTarget::Simple(SimpleAssignTarget::Member(member)) => dotted_name(member),
        _ => None,
    }
}

/// Builds a dotted name (`A.B.C`) from a chain of member accesses over
/// identifiers, or `None` if the chain bottoms out in something else
/// (computed access, a call, etc.).
fn dotted_name(member: &MemberExpr) -> Option<String> {
    let prop = match &member.prop {
        MemberProp::Ident(ident) => ident.sym.to_string(),
        _ => return None,
    };

    let base = match member.obj.as_ref() {
        Expr::Ident(ident) => ident.sym.to_string(),
        Expr::Member(inner) => dotted_name(inner)?,
        _ => return None,
    };

    Some(format!("{base}.{prop}"))
}

fn ident_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Ident(ident) => Some(ident.sym.to_string()),
        Expr::Member(member) => dotted_name(member),
        _ => None,
    }
}

/// Resolves an `extends` clause to its base class plus any mixin
/// applications wrapped around it, e.g. `extends SomeMixin(PolymerElement)`
/// yields `(Some("PolymerElement"), ["SomeMixin"])`. Mixin applications can
/// nest (`extends MixinB(MixinA(Base))`), so the call is peeled recursively,
/// collecting each callee as a mixin reference in outside-in order.
fn superclass_and_mixins(expr: &Expr) -> (Option<String>, Vec<String>) {
    match expr {
        Expr::Call(call) => {
            let mixin_name = match &call.callee {
                Callee::Expr(callee) => ident_name(callee),
                _ => None,
            };
            let (superclass, mut mixins) = match call.args.first() {
                Some(arg) => superclass_and_mixins(arg.expr.as_ref()),
                None => (None, Vec::new()),
            };
            if let Some(name) = mixin_name {
                mixins.insert(0, name);
            }
            (superclass, mixins)
        }
        _ => (ident_name(expr), Vec::new()),
    }
}

fn define_call(call: &CallExpr) -> Option<DefineCall<'_>> {
    let Callee::Expr(callee) = &call.callee else {
        return None;
    };
    let Expr::Member(member) = callee.as_ref() else {
        return None;
    };
    let Expr::Ident(obj) = member.obj.as_ref() else {
        return None;
    };
    if obj.sym.as_ref() != "customElements" {
        return None;
    }
    if !matches!(&member.prop, MemberProp::Ident(p) if p.sym.as_ref() == "define") {
        return None;
    }

    let tag_arg = call.args.first()?.expr.as_ref();
    let class_arg = call.args.get(1)?.expr.as_ref();

    let (tag_literal, tag_from_is_owner) = match tag_arg {
        Expr::Lit(Lit::Str(s)) => (Some(s.value.to_string()), None),
        Expr::Member(MemberExpr { obj, prop,.. })
        if matches!(prop, MemberProp::Ident(p) if p.sym.as_ref() == "is") =>
        {
            (None, ident_name(obj))
        }
        _ => (None, None),
    };

    let (class_ref_name, inline_class) = match class_arg {
        Expr::Class(class_expr) => (None, Some(class_expr.class.as_ref())),
        other => (ident_name(other), None),
    };

    Some(DefineCall {
            tag_literal,
            tag_from_is_owner,
            class_ref_name,
            inline_class,
            span: call.span,
        })
}

/// Returns the leading JSDoc comment immediately preceding `span`, if any.
fn jsdoc_before(comments: &SingleThreadedComments, span: Span) -> Option<JsDoc> {
    use swc_common::comments::{Comment, CommentKind, Comments};

    let leading = comments.get_leading(span.lo)?;
    let block: &Comment = leading.iter().rev().find(|c| c.kind == CommentKind::Block)?;
    Some(JsDoc::parse(&block.text))
}

/// Reads a class's `static get is() { return "tag-name"; }` or
/// `static is = "tag-name";` declaration, used for the `ClassName.is`
/// tie-break.
fn static_is_value(class: &Class) -> Option<String> {
    for member in &class.body {
        match member {
            ClassMember::Method(method) if method.is_static => {
                let PropName::Ident(name) = &method.key else { continue };
                if name.sym.as_ref() != "is" {
                    continue;
                }
                for stmt in method.function.body.iter().flat_map(|b| b.stmts.iter()) {
                    if let Stmt::Return(ret) = stmt {
                        if let Some(Expr::Lit(Lit::Str(s))) = ret.arg.as_deref() {
                            return Some(s.value.to_string());
                        }
                    }
                }
            }
            ClassMember::ClassProp(prop) if prop.is_static => {
                let PropName::Ident(name) = &prop.key else { continue };
                if name.sym.as_ref() != "is" {
                    continue;
                }
                if let Some(Expr::Lit(Lit::Str(s))) = prop.value.as_deref() {
                    return Some(s.value.to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Extracts the `behaviors` array (`static get behaviors()` or
/// `static behaviors = [...]`) from a class body, if declared — the same
/// declaration shape `BehaviorScanner` reads off a behavior's own object
/// literal, generalized to a class-based element: the resolved prototype
/// chain draws no distinction between the two once each side names its
/// entries.
fn static_behaviors_array(class: &Class) -> Option<&ArrayLit> {
    for member in &class.body {
        match member {
            ClassMember::Method(method) if method.is_static => {
                let PropName::Ident(name) = &method.key else { continue };
                if name.sym.as_ref() != "behaviors" {
                    continue;
                }
                for stmt in method.function.body.iter().flat_map(|b| b.stmts.iter()) {
                    if let Stmt::Return(ret) = stmt {
                        if let Some(Expr::Array(arr)) = ret.arg.as_deref() {
                            return Some(arr);
                        }
                    }
                }
            }
            ClassMember::ClassProp(prop) if prop.is_static => {
                let PropName::Ident(name) = &prop.key else { continue };
                if name.sym.as_ref() != "behaviors" {
                    continue;
                }
                if let Some(Expr::Array(arr)) = prop.value.as_deref() {
                    return Some(arr);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extracts the `properties` config object (`static get properties()` or
/// `static properties = {...}`) from a class body, if declared.
fn static_properties_object(class: &Class) -> Option<&ObjectLit> {
    for member in &class.body {
        match member {
            ClassMember::Method(method) if method.is_static => {
                let PropName::Ident(name) = &method.key else { continue };
                if name.sym.as_ref() != "properties" {
                    continue;
                }
                for stmt in method.function.body.iter().flat_map(|b| b.stmts.iter()) {
                    if let Stmt::Return(ret) = stmt {
                        if let Some(Expr::Object(obj)) = ret.arg.as_deref() {
                            return Some(obj);
                        }
                    }
                }
            }
            ClassMember::ClassProp(prop) if prop.is_static => {
                let PropName::Ident(name) = &prop.key else { continue };
                if name.sym.as_ref() != "properties" {
                    continue;
                }
                if let Some(Expr::Object(obj)) = prop.value.as_deref() {
                    return Some(obj);
                }
            }
            _ => {}
        }
    }
    None
}

/// Reads a boolean-valued key out of a property config object literal.
fn object_bool_key(obj: &ObjectLit, key: &str) -> bool {
    object_key_expr(obj, key)
        .map(|expr| matches!(expr, Expr::Lit(Lit::Bool(b)) if b.value))
        .unwrap_or(false)
}

fn object_key_expr<'a>(obj: &'a ObjectLit, key: &str) -> Option<&'a Expr> {
    obj.props.iter().find_map(|p| {
            let PropOrSpread::Prop(prop) = p else { return None };
            let Prop::KeyValue(kv) = prop.as_ref() else { return None };
            let name = match &kv.key {
                PropName::Ident(i) => i.sym.to_string(),
                PropName::Str(s) => s.value.to_string(),
                _ => return None,
            };
            (name == key).then_some(kv.value.as_ref())
        })
}

fn expr_to_type_name(expr: &Expr) -> Option<String> {
    ident_name(expr)
}

fn expr_to_source_hint(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(Lit::Str(s)) => Some(format!("{:?}", s.value)),
        Expr::Lit(Lit::Bool(b)) => Some(b.value.to_string()),
        Expr::Lit(Lit::Num(n)) => Some(n.value.to_string()),
        Expr::Array(_) => Some("[]".to_string()),
        Expr::Object(_) => Some("{}".to_string()),
        Expr::Ident(i) => Some(i.sym.to_string()),
        _ => None,
    }
}

/// Converts a `properties` config object into `(properties, attributes,
/// events)` members (published property → attribute → optional
/// `{attribute}-changed` event).
fn properties_from_config(
    config: &ObjectLit,
    comments: &SingleThreadedComments,
    default_private: bool,
) -> (Vec<PropertyMember>, Vec<AttributeMember>, Vec<EventMember>) {
    let mut properties = Vec::new();
    let mut attributes = Vec::new();
    let mut events = Vec::new();

    for prop in &config.props {
        let PropOrSpread::Prop(prop) = prop else { continue };
        let Prop::KeyValue(kv) = prop.as_ref() else { continue };
        let name = match &kv.key {
            PropName::Ident(i) => i.sym.to_string(),
            PropName::Str(s) => s.value.to_string(),
            _ => continue,
        };

        let key_span = kv.key.span();
        let jsdoc = jsdoc_before(comments, key_span);
        let privacy = get_or_infer_privacy(&name, jsdoc.as_ref(), default_private);
        let range = SourceRange::new(key_span.lo.0, kv.value.span().hi.0);

        let (type_, default_value, notify, read_only) = match kv.value.as_ref() {
            Expr::Object(cfg) => (
                object_key_expr(cfg, "type").and_then(expr_to_type_name),
                object_key_expr(cfg, "value").and_then(expr_to_source_hint),
                object_bool_key(cfg, "notify"),
                object_bool_key(cfg, "readOnly"),
            ),
            other => (expr_to_type_name(other), None, false, false),
        };

        properties.push(PropertyMember {
                name: name.clone(),
                type_,
                default_value,
                notify,
                read_only,
                privacy,
                description: jsdoc.as_ref().map(|j| j.description.clone()).unwrap_or_default(),
                inherited_from: None,
                range,
                source_url: None,
            });

        if privacy == crate::privacy::Privacy::Public {
            if let Some(attribute) = property_name_to_attribute_name(&name) {
                attributes.push(AttributeMember {
                        name: attribute.clone(),
                        description: String::new(),
                        inherited_from: None,
                        range,
                        source_url: None,
                    });
                if notify {
                    events.push(EventMember {
                            name: changed_event_name(&attribute),
                            description: format!("Fired when `{name}` changes."),
                            inherited_from: None,
                            range,
                            source_url: None,
                        });
                }
            }
        }
    }

    (properties, attributes, events)
}

fn methods_from_class(
    class: &Class,
    comments: &SingleThreadedComments,
    default_private: bool,
) -> Vec<MethodMember> {
    let mut methods = Vec::new();
    for member in &class.body {
        let ClassMember::Method(method) = member else { continue };
        if method.is_static || method.kind != swc_ecma_ast::MethodKind::Method {
            continue;
        }
        let PropName::Ident(name) = &method.key else { continue };
        if name.sym.as_ref() == "constructor" {
            continue;
        }

        let jsdoc = jsdoc_before(comments, method.span);
        let params = method
            .function
            .params
            .iter()
            .filter_map(|p| match &p.pat {
                Pat::Ident(ident) => Some((ident.id.sym.to_string(), None)),
                _ => None,
            })
            .collect();

        methods.push(MethodMember {
                name: name.sym.to_string(),
                params,
                return_type: None,
                privacy: get_or_infer_privacy(&name.sym, jsdoc.as_ref(), default_private),
                description: jsdoc.map(|j| j.description).unwrap_or_default(),
                inherited_from: None,
                range: span_to_range(method.span),
                source_url: None,
            });
    }
    methods
}

fn span_to_range(span: Span) -> SourceRange {
    SourceRange::new(span.lo.0, span.hi.0)
}

/// Builds a [`ClassLikeFeature`] from a class AST, without yet knowing
/// whether it is a plain class or an element (the caller decides based on
/// `customElements.define` recognition).
fn class_like_from_class(
    kind: ClassLikeKind,
    name: String,
    class: &Class,
    span: Span,
    doc_span: Span,
    comments: &SingleThreadedComments,
    default_private: bool,
) -> ClassLikeFeature {
    let jsdoc = jsdoc_before(comments, doc_span);
    let mut feature = ClassLikeFeature::new(kind, name, span_to_range(span));
    if let Some(super_expr) = class.super_class.as_deref() {
        let (superclass, mixins) = superclass_and_mixins(super_expr);
        feature.superclass = superclass;
        feature.mixins = mixins;
    }
    feature.methods = methods_from_class(class, comments, default_private);

    if let Some(config) = static_properties_object(class) {
        let (properties, attributes, events) =
        properties_from_config(config, comments, default_private);
        feature.properties = properties;
        feature.attributes = attributes;
        feature.events = events;
    }

    if let Some(behaviors) = static_behaviors_array(class) {
        feature.behaviors = behaviors
            .elems
            .iter()
            .flatten()
            .filter_map(|e| ident_name(e.expr.as_ref()))
            .filter(|name| name != &feature.name)
            .collect();
    }

    if let Some(jsdoc) = &jsdoc {
        crate::feature::apply_common_jsdoc(&mut feature.description, &mut feature.summary, jsdoc);
        feature.demos = jsdoc
            .tags_named("demo")
            .map(|t| t.text.clone())
            .collect();
        feature.privacy = get_or_infer_privacy(&feature.name, Some(jsdoc), default_private);
    } else {
        feature.privacy = get_or_infer_privacy(&feature.name, None, default_private);
    }

    feature
}

/// Recognizes class declarations, class expressions in variable
/// initializers and assignments (including dotted names), and classes
/// referenced by `customElements.define(...)`.
#[derive(Debug, Default)]
pub struct ClassScanner;

impl Scanner for ClassScanner {
    fn scan(&self, document: &ParsedDocument, default_private: bool) -> Vec<ScannedFeature> {
        let Some(ScriptDocument { module, comments }) = document.ast.as_script() else {
            return Vec::new();
        };

        let (bindings, defines) = collect_top_level(&module.body);

        let mut features = Vec::new();

        // `customElements.define(tag, inline class expression)`: always an
        // element, no corresponding top-level binding to suppress.
        for define in &defines {
            if let Some(class) = define.inline_class {
                let tag_name = resolve_tag_name(define, None);
                let mut feature = class_like_from_class(
                    ClassLikeKind::Element,
                    tag_name.clone().unwrap_or_default(),
                    class,
                    define.span,
                    define.span,
                    comments,
                    default_private,
                );
                feature.tag_name = tag_name;
                features.push(ScannedFeature::ClassLike(feature));
            }
        }

        let defined_names: std::collections::HashMap<&str, &DefineCall<'_>> = defines
            .iter()
            .filter_map(|d| d.class_ref_name.as_deref().map(|n| (n, d)))
            .collect();

        for binding in &bindings {
            let BindingValue::Class(class) = binding.value else {
                continue;
            };

            if let Some(&define) = defined_names.get(binding.name.as_str()) {
                let tag_name = resolve_tag_name(define, static_is_value(class));
                let mut feature = class_like_from_class(
                    ClassLikeKind::Element,
                    binding.name.clone(),
                    class,
                    binding.span,
                    binding.doc_span,
                    comments,
                    default_private,
                );
                feature.tag_name = tag_name;
                features.push(ScannedFeature::ClassLike(feature));
            } else {
                let feature = class_like_from_class(
                    ClassLikeKind::Class,
                    binding.name.clone(),
                    class,
                    binding.span,
                    binding.doc_span,
                    comments,
                    default_private,
                );
                features.push(ScannedFeature::ClassLike(feature));
            }
        }

        features
    }
}

fn resolve_tag_name(define: &DefineCall<'_>, class_static_is: Option<String>) -> Option<String> {
    // String literal first argument always wins the tie-break.
    define
        .tag_literal
        .clone()
        .or(class_static_is)
        .or_else(|| define.tag_from_is_owner.clone())
}

/// Recognizes mixin-producing functions: plain function declarations, arrow
/// expressions, function expressions assigned to a variable, and the
/// `Namespace.helper(function Mixin(base) {...})` wrapper shape.
///
/// A binding only becomes a mixin if annotated `@polymerMixin`; unannotated
/// function helpers are ignored.
#[derive(Debug, Default)]
pub struct MixinScanner;

impl Scanner for MixinScanner {
    fn scan(&self, document: &ParsedDocument, default_private: bool) -> Vec<ScannedFeature> {
        let Some(ScriptDocument { module, comments }) = document.ast.as_script() else {
            return Vec::new();
        };

        let (bindings, _) = collect_top_level(&module.body);

        bindings
            .iter()
            .filter_map(|binding| {
                let jsdoc = jsdoc_before(comments, binding.doc_span);
                let is_mixin = jsdoc.as_ref().is_some_and(|j| j.has_tag("polymerMixin"));
                if !is_mixin {
                    return None;
                }

                let mut feature =
                ClassLikeFeature::new(ClassLikeKind::Mixin, binding.name.clone(), span_to_range(binding.span));

                match binding.value {
                    BindingValue::Function(f) | BindingValue::WrappedFunction(f) => {
                        if let Some(inner_class) = inner_returned_class(f) {
                            if let Some(super_expr) = inner_class.super_class.as_deref() {
                                let (superclass, mixins) = superclass_and_mixins(super_expr);
                                feature.superclass = superclass;
                                feature.mixins = mixins;
                            }
                            feature.methods = methods_from_class(inner_class, comments, default_private);
                            if let Some(config) = static_properties_object(inner_class) {
                                let (properties, attributes, events) =
                                properties_from_config(config, comments, default_private);
                                feature.properties = properties;
                                feature.attributes = attributes;
                                feature.events = events;
                            }
                        }
                    }
                    BindingValue::Arrow(arrow) => {
                        if let Some(inner_class) = class_from_arrow_body(arrow) {
                            if let Some(super_expr) = inner_class.super_class.as_deref() {
                                let (superclass, mixins) = superclass_and_mixins(super_expr);
                                feature.superclass = superclass;
                                feature.mixins = mixins;
                            }
                            feature.methods = methods_from_class(inner_class, comments, default_private);
                        }
                    }
                    // "A plain let/var with no function body yields an
                    // empty-members mixin record".
                    _ => {}
                }

                if let Some(jsdoc) = &jsdoc {
                    crate::feature::apply_common_jsdoc(&mut feature.description, &mut feature.summary, jsdoc);
                }
                feature.privacy = get_or_infer_privacy(&feature.name, jsdoc.as_ref(), default_private);

                Some(ScannedFeature::ClassLike(feature))
            })
            .collect()
    }
}

/// Finds the class expression inside a mixin factory function's body: either
/// a `return class extends base {...};` or a `class Mixin extends base
/// {...}; return Mixin;` pair.
fn inner_returned_class(function: &Function) -> Option<&Class> {
    let body = function.body.as_ref()?;
    let mut declared: Option<&Class> = None;

    for stmt in &body.stmts {
        match stmt {
            Stmt::Decl(Decl::Class(class_decl)) => declared = Some(&class_decl.class),
            Stmt::Return(ret) => {
                if let Some(Expr::Class(class_expr)) = ret.arg.as_deref() {
                    return Some(&class_expr.class);
                }
                if let Some(Expr::Ident(_)) = ret.arg.as_deref() {
                    return declared;
                }
            }
            _ => {}
        }
    }

    declared
}

fn class_from_arrow_body(arrow: &ArrowExpr) -> Option<&Class> {
    use swc_ecma_ast::BlockStmtOrExpr;
    match arrow.body.as_ref() {
        BlockStmtOrExpr::Expr(expr) => match expr.as_ref() {
            Expr::Class(class_expr) => Some(&class_expr.class),
            _ => None,
        },
        BlockStmtOrExpr::BlockStmt(block) => block.stmts.iter().find_map(|stmt| {
                if let Stmt::Return(ret) = stmt {
                    if let Some(Expr::Class(class_expr)) = ret.arg.as_deref() {
                        return Some(&class_expr.class);
                    }
                }
                None
            }),
    }
}

/// Recognizes object literals bound to dotted names annotated
/// `@polymerBehavior`, including array-of-identifier compositions.
#[derive(Debug, Default)]
pub struct BehaviorScanner;

impl Scanner for BehaviorScanner {
    fn scan(&self, document: &ParsedDocument, default_private: bool) -> Vec<ScannedFeature> {
        let Some(ScriptDocument { module, comments }) = document.ast.as_script() else {
            return Vec::new();
        };

        let (bindings, _) = collect_top_level(&module.body);

        bindings
            .iter()
            .filter_map(|binding| {
                let jsdoc = jsdoc_before(comments, binding.doc_span);
                let is_behavior = jsdoc.as_ref().is_some_and(|j| j.has_tag("polymerBehavior"));
                if !is_behavior {
                    return None;
                }

                let mut feature = ClassLikeFeature::new(
                    ClassLikeKind::Behavior,
                    binding.name.clone(),
                    span_to_range(binding.span),
                );

                match binding.value {
                    BindingValue::Object(obj) => {
                        if let Some(props_config) = object_key_expr(obj, "properties").and_then(|e| {
                                if let Expr::Object(o) = e { Some(o) } else { None }
                            }) {
                            let (properties, attributes, events) =
                            properties_from_config(props_config, comments, default_private);
                            feature.properties = properties;
                            feature.attributes = attributes;
                            feature.events = events;
                        }
                        if let Some(Expr::Array(behaviors)) = object_key_expr(obj, "behaviors") {
                            feature.behaviors = behaviors
                                .elems
                                .iter()
                                .flatten()
                                .filter_map(|e| ident_name(e.expr.as_ref()))
                                .filter(|name| name != &feature.name)
                                .collect();
                        }
                    }
                    BindingValue::Array(composed) => {
                        feature.behaviors = composed
                            .elems
                            .iter()
                            .flatten()
                            .filter_map(|e| ident_name(e.expr.as_ref()))
                            .filter(|name| name != &feature.name)
                            .collect();
                    }
                    _ => {}
                }

                if let Some(jsdoc) = &jsdoc {
                    crate::feature::apply_common_jsdoc(&mut feature.description, &mut feature.summary, jsdoc);
                    feature.demos = jsdoc.tags_named("demo").map(|t| t.text.clone()).collect();
                }
                feature.privacy = get_or_infer_privacy(&feature.name, jsdoc.as_ref(), default_private);

                Some(ScannedFeature::ClassLike(feature))
            })
            .fold(Vec::<ScannedFeature>::new(), |mut acc, next| {
                merge_behavior_into(&mut acc, next);
                acc
            })
    }
}

/// Merges `next` into `acc`, following the same-name behavior merge
/// policy: if a behavior with the same name was already emitted earlier in
/// this document's scan, it is replaced by a merge of the two (longest
/// description wins, events/properties/behaviors are unioned, demos are
/// concatenated) rather than emitted twice. This only applies *within* one
/// document's own scan order; it says nothing about documents scanned
/// independently.
fn merge_behavior_into(acc: &mut Vec<ScannedFeature>, next: ScannedFeature) {
    let ScannedFeature::ClassLike(next) = next else {
        acc.push(next);
        return;
    };

    if let Some(existing) = acc.iter_mut().find_map(|f| match f {
            ScannedFeature::ClassLike(c) if c.kind == ClassLikeKind::Behavior && c.name == next.name => Some(c),
            _ => None,
        }) {
        if next.description.len() > existing.description.len() {
            existing.description = next.description;
        }
        if next.summary.len() > existing.summary.len() {
            existing.summary = next.summary;
        }
        for event in next.events {
            if !existing.events.iter().any(|e| e.name == event.name) {
                existing.events.push(event);
            }
        }
        existing.demos.extend(next.demos);
        for prop in next.properties {
            if !existing.properties.iter().any(|p| p.name == prop.name) {
                existing.properties.push(prop);
            }
        }
        for attr in next.attributes {
            if !existing.attributes.iter().any(|a| a.name == attr.name) {
                existing.attributes.push(attr);
            }
        }
        for behavior in next.behaviors {
            if !existing.behaviors.contains(&behavior) {
                existing.behaviors.push(behavior);
            }
        }
        existing.range = next.range;
    } else {
        acc.push(ScannedFeature::ClassLike(next));
    }
}

/// Recognizes function declarations and function-typed
/// initializers/assignments carrying a `@memberof` annotation.
#[derive(Debug, Default)]
pub struct FunctionScanner;

impl Scanner for FunctionScanner {
    fn scan(&self, document: &ParsedDocument, default_private: bool) -> Vec<ScannedFeature> {
        let Some(ScriptDocument { module, comments }) = document.ast.as_script() else {
            return Vec::new();
        };

        let (bindings, _) = collect_top_level(&module.body);

        bindings
            .iter()
            .filter_map(|binding| {
                let function = match binding.value {
                    BindingValue::Function(f) => Some(f),
                    _ => None,
                };
                let jsdoc = jsdoc_before(comments, binding.doc_span)?;
                let memberof = jsdoc.memberof()?.to_string();

                let params = function
                    .map(|f| {
                        f.params
                            .iter()
                            .filter_map(|p| match &p.pat {
                                Pat::Ident(ident) => Some((ident.id.sym.to_string(), None)),
                                _ => None,
                            })
                            .collect()
                    })
                    .unwrap_or_else(|| jsdoc.params());

                Some(ScannedFeature::Function(FunctionFeature {
                            name: binding.name.clone(),
                            memberof: Some(memberof),
                            params,
                            return_type: None,
                            privacy: get_or_infer_privacy(&binding.name, Some(&jsdoc), default_private),
                            description: jsdoc.description.clone(),
                            range: span_to_range(binding.span),
                        }))
            })
            .collect()
    }
}

/// Recognizes object literals annotated `@namespace`.
#[derive(Debug, Default)]
pub struct NamespaceScanner;

impl Scanner for NamespaceScanner {
    fn scan(&self, document: &ParsedDocument, _default_private: bool) -> Vec<ScannedFeature> {
        let Some(ScriptDocument { module, comments }) = document.ast.as_script() else {
            return Vec::new();
        };

        let (bindings, _) = collect_top_level(&module.body);

        bindings
            .iter()
            .filter_map(|binding| {
                if !matches!(binding.value, BindingValue::Object(_)) {
                    return None;
                }
                let jsdoc = jsdoc_before(comments, binding.doc_span)?;
                if !jsdoc.has_tag("namespace") {
                    return None;
                }

                Some(ScannedFeature::Namespace(NamespaceFeature {
                            name: binding.name.clone(),
                            description: jsdoc.description.clone(),
                            range: span_to_range(binding.span),
                        }))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parser, ScriptParser};
    use crate::url::CanonicalUrl;

    fn parse(source: &str) -> ParsedDocument {
        let url = CanonicalUrl::from_canonical("file:///test.js");
        ScriptParser.parse(source.as_bytes(), &url, None).expect("valid script")
    }

    fn class_names(features: &[ScannedFeature]) -> Vec<&str> {
        features
            .iter()
            .map(|f| match f {
                ScannedFeature::ClassLike(c) => c.name.as_str(),
                _ => panic!("expected a class-like feature, got {f:?}"),
            })
            .collect()
    }

    #[test]
    fn class_scanner_recognizes_every_naming_form() {
        let document = parse(
            r#"
 class Declaration {}
 var VarDeclaration = class {};
 Assignment = class {};
 Namespace.AlsoAssignment = class {};
 Declared.Deeper.AnotherAssignment = class {};
 "#,
        );

        let features = ClassScanner.scan(&document, false);
        assert_eq!(
            class_names(&features),
            vec![
                "Declaration",
                "VarDeclaration",
                "Assignment",
                "Namespace.AlsoAssignment",
                "Declared.Deeper.AnotherAssignment",
            ]
        );
        for feature in &features {
            let ScannedFeature::ClassLike(c) = feature else { unreachable!() };
            assert_eq!(c.kind, ClassLikeKind::Class);
        }
    }

    #[test]
    fn class_extends_a_mixin_application_keeps_both_superclass_and_mixin() {
        let document = parse(
            r#"
 class MyElement extends SomeMixin(PolymerElement) {}
 "#,
        );

        let features = ClassScanner.scan(&document, false);
        assert_eq!(features.len(), 1);
        let ScannedFeature::ClassLike(c) = &features[0] else { unreachable!() };
        assert_eq!(c.superclass.as_deref(), Some("PolymerElement"));
        assert_eq!(c.mixins, vec!["SomeMixin".to_string()]);
    }

    #[test]
    fn class_extends_nested_mixin_applications_collects_all_mixins_in_order() {
        let document = parse(
            r#"
 class MyElement extends MixinB(MixinA(PolymerElement)) {}
 "#,
        );

        let features = ClassScanner.scan(&document, false);
        assert_eq!(features.len(), 1);
        let ScannedFeature::ClassLike(c) = &features[0] else { unreachable!() };
        assert_eq!(c.superclass.as_deref(), Some("PolymerElement"));
        assert_eq!(c.mixins, vec!["MixinB".to_string(), "MixinA".to_string()]);
    }

    #[test]
    fn custom_elements_define_string_literal_wins_the_tag_name_tie_break() {
        let document = parse(
            r#"
 class MyElement {
 static get is() { return "wrong-tag"; }
 }
 customElements.define("my-element", MyElement);
 "#,
        );

        let features = ClassScanner.scan(&document, false);
        assert_eq!(features.len(), 1);
        let ScannedFeature::ClassLike(c) = &features[0] else { unreachable!() };
        assert_eq!(c.kind, ClassLikeKind::Element);
        assert_eq!(c.tag_name.as_deref(), Some("my-element"));
    }

    #[test]
    fn custom_elements_define_falls_back_to_static_is_without_a_literal() {
        let document = parse(
            r#"
 class MyElement {
 static get is() { return "my-element"; }
 }
 customElements.define(MyElement.is, MyElement);
 "#,
        );

        let features = ClassScanner.scan(&document, false);
        assert_eq!(features.len(), 1);
        let ScannedFeature::ClassLike(c) = &features[0] else { unreachable!() };
        assert_eq!(c.kind, ClassLikeKind::Element);
        assert_eq!(c.tag_name.as_deref(), Some("my-element"));
    }

    #[test]
    fn class_scanner_reads_a_static_behaviors_getter() {
        let document = parse(
            r#"
 class MyElement extends Polymer.Element {
 static get is() { return "my-element"; }
 static get behaviors() {
 return [MyNamespace.SimpleBehavior, MyNamespace.SimpleBehavior];
 }
 }
 customElements.define(MyElement.is, MyElement);
 "#,
        );

        let features = ClassScanner.scan(&document, false);
        assert_eq!(features.len(), 1);
        let ScannedFeature::ClassLike(c) = &features[0] else { unreachable!() };
        assert_eq!(c.kind, ClassLikeKind::Element);
        assert_eq!(c.behaviors, vec!["MyNamespace.SimpleBehavior", "MyNamespace.SimpleBehavior"]);
    }

    #[test]
    fn class_scanner_reads_a_static_behaviors_field() {
        let document = parse(
            r#"
 class MyElement extends Polymer.Element {
 static behaviors = [SimpleBehavior];
 }
 "#,
        );

        let features = ClassScanner.scan(&document, false);
        assert_eq!(features.len(), 1);
        let ScannedFeature::ClassLike(c) = &features[0] else { unreachable!() };
        assert_eq!(c.behaviors, vec!["SimpleBehavior"]);
    }

    #[test]
    fn mixin_scanner_requires_the_polymer_mixin_tag() {
        let document = parse(
            r#"
 function PlainHelper(base) {
 return class extends base {};
 }

 /**
 * @polymerMixin
 */
 function AnnotatedMixin(base) {
 return class extends base {
 static get properties() { return { foo: String }; }
 };
 }
 "#,
        );

        let features = MixinScanner.scan(&document, false);
        assert_eq!(class_names(&features), vec!["AnnotatedMixin"]);
        let ScannedFeature::ClassLike(c) = &features[0] else { unreachable!() };
        assert_eq!(c.kind, ClassLikeKind::Mixin);
        assert_eq!(c.properties.len(), 1);
        assert_eq!(c.properties[0].name, "foo");
    }

    #[test]
    fn mixin_scanner_recognizes_every_function_form() {
        let document = parse(
            r#"
 /** @polymerMixin */
 function DeclarationMixin(base) {
 return class extends base {};
 }

 /** @polymerMixin */
 const ArrowMixin = (base) => class extends base {};

 /** @polymerMixin */
 const ExpressionMixin = function(base) {
 return class extends base {};
 };

 /** @polymerMixin */
 Namespace.WrappedMixin = Namespace.dedupingMixin(function WrappedMixin(base) {
 class WrappedMixin extends base {}
 return WrappedMixin;
 });
 "#,
        );

        let features = MixinScanner.scan(&document, false);
        assert_eq!(
            class_names(&features),
            vec![
                "DeclarationMixin",
                "ArrowMixin",
                "ExpressionMixin",
                "Namespace.WrappedMixin",
            ]
        );
    }

    #[test]
    fn mixin_scanner_accepts_an_uninitialized_binding_as_an_empty_mixin() {
        let document = parse(
            r#"
 /** @polymerMixin */
 var EmptyMixin;
 "#,
        );

        let features = MixinScanner.scan(&document, false);
        assert_eq!(class_names(&features), vec!["EmptyMixin"]);
        let ScannedFeature::ClassLike(c) = &features[0] else { unreachable!() };
        assert!(c.methods.is_empty());
        assert!(c.properties.is_empty());
    }

    #[test]
    fn behavior_scanner_merges_same_named_behaviors_across_a_document() {
        let document = parse(
            r#"
 /**
 * A short description.
 * @polymerBehavior
 */
 Polymer.SplitBehavior = {
 properties: {
 foo: String
 }
 };

 /**
 * A longer, more thorough description of the same behavior.
 * @polymerBehavior
 */
 Polymer.SplitBehavior = {
 properties: {
 bar: Number
 }
 };
 "#,
        );

        let features = BehaviorScanner.scan(&document, false);
        assert_eq!(features.len(), 1);
        let ScannedFeature::ClassLike(c) = &features[0] else { unreachable!() };
        assert_eq!(c.kind, ClassLikeKind::Behavior);
        assert_eq!(c.description, "A longer, more thorough description of the same behavior.");
        let mut names: Vec<&str> = c.properties.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["bar", "foo"]);
    }

    #[test]
    fn behavior_scanner_flattens_an_array_composed_behavior() {
        let document = parse(
            r#"
 /** @polymerBehavior */
 Polymer.ComposedBehavior = [Polymer.BehaviorA, Polymer.BehaviorB];
 "#,
        );

        let features = BehaviorScanner.scan(&document, false);
        assert_eq!(features.len(), 1);
        let ScannedFeature::ClassLike(c) = &features[0] else { unreachable!() };
        assert_eq!(c.behaviors, vec!["Polymer.BehaviorA", "Polymer.BehaviorB"]);
    }

    #[test]
    fn no_duplicate_classification_for_an_annotated_element_and_a_plain_class() {
        let document = parse(
            r#"
 /**
 * @customElement
 */
 class MyElement extends HTMLElement {}
 customElements.define("my-element", MyElement);

 class PlainHelper {}

 /** @polymerMixin */
 function AnnotatedMixin(base) {
 return class extends base {};
 }

 function plainHelperFunction(base) {
 return class extends base {};
 }
 "#,
        );

        let class_features = ClassScanner.scan(&document, false);
        let mixin_features = MixinScanner.scan(&document, false);

        assert_eq!(class_names(&class_features), vec!["MyElement", "PlainHelper"]);
        assert_eq!(class_names(&mixin_features), vec!["AnnotatedMixin"]);

        let ScannedFeature::ClassLike(element) = &class_features[0] else { unreachable!() };
        assert_eq!(element.kind, ClassLikeKind::Element);
    }

    #[test]
    fn function_scanner_requires_a_memberof_tag() {
        let document = parse(
            r#"
 /**
 * Adds two numbers.
 * @memberof MathUtils
 * @param {number} a the first addend
 * @param {number} b the second addend
 */
 function add(a, b) {
 return a + b;
 }

 function notDocumented(a, b) {
 return a - b;
 }
 "#,
        );

        let features = FunctionScanner.scan(&document, false);
        assert_eq!(features.len(), 1);
        let ScannedFeature::Function(f) = &features[0] else { unreachable!() };
        assert_eq!(f.name, "add");
        assert_eq!(f.memberof.as_deref(), Some("MathUtils"));
        assert_eq!(
            f.params,
            vec![("a".to_string(), None), ("b".to_string(), None)]
        );
    }

    #[test]
    fn namespace_scanner_requires_the_namespace_tag() {
        let document = parse(
            r#"
 /**
 * Shared math helpers.
 * @namespace
 */
 const MathUtils = {
 add: function(a, b) { return a + b; }
 };

 const NotANamespace = {};
 "#,
        );

        let features = NamespaceScanner.scan(&document, false);
        assert_eq!(features.len(), 1);
        let ScannedFeature::Namespace(ns) = &features[0] else { unreachable!() };
        assert_eq!(ns.name, "MathUtils");
        assert_eq!(ns.description, "Shared math helpers.");
    }
}
