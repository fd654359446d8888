//! Per-lambda analysis.
//!
//! Walks the body of a resumable lambda building the scope-and-yield model,
//! and performs the analyzer-stage rewrites: local declarations become
//! placement construction plus a state assignment, local references become
//! qualified union names, explicit `this` becomes the captured-this member,
//! and the `lambda_this` placeholder becomes literal `this`. Yield-site
//! statements are only *recorded* here; the code generator replaces them
//! after it has read back the rewritten expression text.

use arborium_tree_sitter::Node;
use indexmap::{IndexMap, IndexSet};

use coropp_core::{Rewriter, Span};

use crate::analyze::captures::{
    self, CaptureList, DefaultCapture, Param, parse_capture_list, parse_params,
};
use crate::analyze::model::{
    Capture, CaptureForm, LambdaModel, ScopeId, ScopeKind, SubGen, YieldId, YieldKind,
};
use crate::encode::{LAMBDA_THIS, RETURN_FROM_FN, SUSPEND_FN, YIELD_FN, YIELD_FROM_FN};
use crate::lang;
use crate::lexer::{Tok, lex};
use crate::{Error, Result};

/// Builtin scalar keywords: an initializer-less declaration made only of
/// these (plus pointers) stays raw storage and never needs destruction.
const BUILTIN_TYPE_WORDS: &[&str] = &[
    "void", "bool", "char", "short", "int", "long", "float", "double", "signed", "unsigned",
    "auto", "size_t", "wchar_t", "char16_t", "char32_t", "const", "volatile",
];

pub struct Analyzer<'a> {
    source: &'a str,
    rewriter: &'a mut Rewriter,
    model: LambdaModel,
    body: Node<'a>,
    /// Innermost-last stack of name -> local index bindings.
    bindings: Vec<IndexMap<String, usize>>,
    /// The enclosing scope's most recent prior yield.
    current_yield: YieldId,
    params: Vec<Param>,
    /// Capture name -> alias type name, for type-context rewriting.
    capture_aliases: IndexMap<String, String>,
    this_alias: Option<String>,
}

/// Analyze one resumable lambda, mutating the rewriter with the
/// analyzer-stage edits. `id` is the fresh lambda id from the translation
/// unit context.
pub fn analyze<'a>(
    lambda: Node<'a>,
    source: &'a str,
    rewriter: &'a mut Rewriter,
    id: u32,
) -> Result<LambdaModel> {
    let body = lambda
        .child_by_field_name("body")
        .ok_or_else(|| Error::Analyze("resumable lambda has no body".into()))?;

    let mut model = LambdaModel::new(id, lang::span(lambda), lang::span(body));

    let captures_node = lambda
        .child_by_field_name("captures")
        .or_else(|| find_child_kind(lambda, "lambda_capture_specifier"));
    let capture_list = match captures_node {
        Some(n) => parse_capture_list(lang::text(n, source)),
        None => parse_capture_list("[]"),
    };

    // Signature, taken from the declarator only (capture initializers may
    // hold unrelated lambdas with their own parameter lists).
    if let Some(declarator) = lambda.child_by_field_name("declarator") {
        if let Some(params_node) = find_descendant_kind(declarator, "parameter_list", body) {
            model.params = lang::text(params_node, source).to_string();
        }
        if let Some(trailing) = find_descendant_kind(declarator, "trailing_return_type", body) {
            let text = lang::text(trailing, source);
            model.return_type = Some(text.trim_start_matches("->").trim().to_string());
        }
    }
    let params = parse_params(&model.params);

    // `initializer(<lambda>)` special form: replace the whole call.
    if let Some(call) = enclosing_initializer_call(lambda, source) {
        model.as_initializer = true;
        model.replace_span = lang::span(call);
    }

    model.captures = resolve_captures(&capture_list, body, source, &params);
    model.uses_this = model
        .captures
        .iter()
        .any(|c| c.form == CaptureForm::This);

    let mut capture_aliases = IndexMap::new();
    let mut this_alias = None;
    for (i, c) in model.captures.iter().enumerate() {
        match &c.name {
            Some(name) => {
                capture_aliases.insert(name.clone(), c.alias(i));
            }
            None => this_alias = Some(c.alias(i)),
        }
    }

    let mut analyzer = Analyzer {
        source,
        rewriter,
        model,
        body,
        bindings: Vec::new(),
        current_yield: YieldId::INITIAL,
        params,
        capture_aliases,
        this_alias,
    };

    let root = analyzer
        .model
        .push_scope(None, ScopeKind::Body, lang::span(body), YieldId::INITIAL);
    analyzer.bindings.push(IndexMap::new());
    analyzer.walk_block(body, root)?;
    analyzer.bindings.pop();

    Ok(analyzer.model)
}

/// Resolve explicit captures plus any default-capture inference.
fn resolve_captures(
    list: &CaptureList,
    body: Node<'_>,
    source: &str,
    params: &[Param],
) -> Vec<Capture> {
    let mut captures = list.explicit.clone();

    if list.default != DefaultCapture::None {
        let mut bound: IndexSet<String> = IndexSet::new();
        for c in &captures {
            if let Some(n) = &c.name {
                bound.insert(n.clone());
            }
        }
        for p in params {
            if let Some(n) = &p.name {
                bound.insert(n.clone());
            }
        }
        for decl in declared_names(body, source) {
            bound.insert(decl);
        }

        for name in captures::free_identifiers(body, source, &bound) {
            let form = match list.default {
                DefaultCapture::ByRef => CaptureForm::ByRef,
                _ => CaptureForm::ByValue,
            };
            captures.push(Capture {
                form,
                name: Some(name),
            });
        }

        if captures::body_uses_this(body, source)
            && !captures.iter().any(|c| c.form == CaptureForm::This)
        {
            captures.push(Capture {
                form: CaptureForm::This,
                name: None,
            });
        }
    }

    captures
}

/// Names declared anywhere in the body (scope-insensitive; only used to
/// keep declared locals out of the inferred capture set).
fn declared_names(body: Node<'_>, source: &str) -> Vec<String> {
    let mut out = Vec::new();
    for n in lang::descendants(body) {
        if n.kind() != "declaration" {
            continue;
        }
        for d in lang::children(n) {
            collect_declarator_names(d, source, &mut out);
        }
    }
    out
}

fn collect_declarator_names(node: Node<'_>, source: &str, out: &mut Vec<String>) {
    match node.kind() {
        "identifier" => out.push(lang::text(node, source).to_string()),
        "init_declarator" | "pointer_declarator" | "reference_declarator"
        | "function_declarator" | "array_declarator" | "parenthesized_declarator" => {
            if let Some(inner) = node.child_by_field_name("declarator") {
                collect_declarator_names(inner, source, out);
            }
        }
        _ => {}
    }
}

enum InitForm<'t> {
    None,
    Assign(Node<'t>),
    Parens(Node<'t>),
    Braced(Node<'t>),
}

impl<'a> Analyzer<'a> {
    fn lookup(&self, name: &str) -> Option<usize> {
        self.bindings
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
    }

    fn enter_scope(&mut self, parent: ScopeId, kind: ScopeKind, span: Span) -> ScopeId {
        let id = self
            .model
            .push_scope(Some(parent), kind, span, self.current_yield);
        self.bindings.push(IndexMap::new());
        id
    }

    /// Restore the prior-yield tracker and emit the scope bracket.
    fn exit_scope(&mut self, id: ScopeId, braced: bool) -> Result<()> {
        self.bindings.pop();
        let scope = self.model.scope(id).clone();
        self.current_yield = scope.entry_yield;
        if scope.has_locals && braced {
            // Normal exit destroys the scope's locals in LIFO order.
            self.rewriter.insert_before(
                scope.span.end() - 1,
                format!("__unwind_to({}); ", scope.entry_yield),
            )?;
        }
        Ok(())
    }

    /// Unwind bracket after a `for`/`while`/`if` whose synthetic outer scope
    /// introduced locals (loop-header declarations).
    fn bracket_after_construct(&mut self, id: ScopeId) -> Result<()> {
        let scope = self.model.scope(id).clone();
        if scope.has_locals {
            self.rewriter.insert_after(
                scope.span.end(),
                format!(" __unwind_to({});", scope.entry_yield),
            )?;
        }
        Ok(())
    }

    fn walk_block(&mut self, block: Node<'a>, scope: ScopeId) -> Result<()> {
        for child in lang::children(block) {
            if child.is_named() {
                self.walk_statement(child, scope)?;
            }
        }
        Ok(())
    }

    fn walk_statement(&mut self, node: Node<'a>, scope: ScopeId) -> Result<()> {
        match node.kind() {
            "compound_statement" => {
                let inner = self.enter_scope(scope, ScopeKind::Compound, lang::span(node));
                self.walk_block(node, inner)?;
                self.exit_scope(inner, true)
            }
            "declaration" => self.handle_declaration(node, scope),
            "for_statement" => self.handle_for(node, scope),
            "while_statement" => self.handle_while(node, scope),
            "do_statement" => self.handle_do(node, scope),
            "if_statement" => self.handle_if(node, scope),
            "expression_statement" => self.handle_expression_statement(node, scope),
            "return_statement" => self.handle_return(node, scope),
            "break_statement" | "continue_statement" => Ok(()),
            _ => self.rewrite_refs(node),
        }
    }

    fn handle_expression_statement(&mut self, node: Node<'a>, scope: ScopeId) -> Result<()> {
        let Some(call) =
            first_named_non_comment(node).filter(|n| n.kind() == "call_expression")
        else {
            return self.rewrite_refs(node);
        };
        match callee_name(call, self.source) {
            Some(YIELD_FN) => self.handle_yield(node, call, scope),
            Some(YIELD_FROM_FN) => self.handle_delegation(node, call, scope, false),
            Some(SUSPEND_FN) => {
                let y = self.model.push_yield(
                    self.current_yield,
                    scope,
                    YieldKind::Suspend,
                    lang::span(node),
                );
                self.current_yield = y;
                Ok(())
            }
            _ => self.rewrite_refs(node),
        }
    }

    fn handle_yield(&mut self, stmt: Node<'a>, call: Node<'a>, scope: ScopeId) -> Result<()> {
        let arg = sole_argument(call)
            .ok_or_else(|| Error::Analyze("yield encoding without an argument".into()))?;
        self.rewrite_refs(arg)?;
        let expr = self.rewriter.text_for(lang::span(arg))?;
        if self.model.first_value_expr.is_none() {
            self.model.first_value_expr = Some(expr.clone());
        }
        let y = self.model.push_yield(
            self.current_yield,
            scope,
            YieldKind::Value { expr },
            lang::span(stmt),
        );
        self.current_yield = y;
        Ok(())
    }

    fn handle_return(&mut self, node: Node<'a>, scope: ScopeId) -> Result<()> {
        let Some(expr) = first_named_non_comment(node) else {
            return Ok(());
        };
        if expr.kind() == "call_expression"
            && callee_name(expr, self.source) == Some(RETURN_FROM_FN)
        {
            return self.handle_delegation(node, expr, scope, true);
        }
        self.rewrite_refs(expr)?;
        if self.model.first_value_expr.is_none() {
            self.model.first_value_expr = Some(self.rewriter.text_for(lang::span(expr))?);
        }
        Ok(())
    }

    fn handle_delegation(
        &mut self,
        stmt: Node<'a>,
        call: Node<'a>,
        scope: ScopeId,
        tail: bool,
    ) -> Result<()> {
        let arg = sole_argument(call)
            .ok_or_else(|| Error::Analyze("delegation encoding without a sub-generator".into()))?;

        let sub = if is_lvalue_generator(arg) {
            self.rewrite_refs(arg)?;
            let expr = self.rewriter.text_for(lang::span(arg))?.trim().to_string();
            let expr_member = self.qualify_captures(&expr);
            SubGen {
                expr,
                expr_member,
                inline_local: None,
                live_yield: None,
                init: None,
            }
        } else {
            // Materialized temporary: synthesize storage for it. The type is
            // spelled as a decltype over the expression with captures and
            // locals replaced by unevaluated lvalue makers.
            let type_expr = self.type_context_expr(arg);
            self.rewrite_refs(arg)?;
            let init_expr = self.rewriter.text_for(lang::span(arg))?.trim().to_string();

            let live = YieldId(self.model.yields.len() as i32 + 1);
            let alias = format!("__sub{}_t", live.0);
            let name = format!("__sub{}", live.0);
            self.model
                .sub_aliases
                .push((alias.clone(), format!("decltype({type_expr})")));

            let local = self.model.locals.len();
            let qualified = self.model.qualified(scope, &name);
            self.model.locals.push(crate::analyze::model::Local {
                name,
                ty: alias,
                scope,
                yield_id: None, // patched below once the yield exists
                decl_span: lang::span(stmt),
                synthesized: true,
            });
            self.model.scopes[scope.0 as usize].has_locals = true;

            let live_id = self.model.push_yield(
                self.current_yield,
                scope,
                YieldKind::SubLive { local },
                lang::span(stmt),
            );
            debug_assert_eq!(live_id, live);
            self.model.locals[local].yield_id = Some(live_id);
            self.current_yield = live_id;

            SubGen {
                expr: qualified.clone(),
                expr_member: qualified,
                inline_local: Some(local),
                live_yield: Some(live_id),
                init: Some(init_expr),
            }
        };

        if self.model.first_value_expr.is_none() {
            self.model.first_value_expr = Some(format!("{}()", sub.expr));
        }

        let kind = if tail {
            YieldKind::TailDelegate { sub }
        } else {
            YieldKind::Delegate { sub }
        };
        let y = self
            .model
            .push_yield(self.current_yield, scope, kind, lang::span(stmt));
        self.current_yield = y;
        Ok(())
    }

    fn handle_for(&mut self, node: Node<'a>, scope: ScopeId) -> Result<()> {
        let outer = self.enter_scope(scope, ScopeKind::ConstructOuter, lang::span(node));

        if let Some(init) = node.child_by_field_name("initializer") {
            if init.kind() == "declaration" {
                self.handle_declaration(init, outer)?;
            } else {
                self.rewrite_refs(init)?;
            }
        }
        if let Some(cond) = node.child_by_field_name("condition") {
            self.rewrite_refs(cond)?;
        }
        if let Some(update) = node.child_by_field_name("update") {
            self.rewrite_refs(update)?;
        }
        self.walk_construct_body(node, outer)?;

        self.exit_scope(outer, false)?;
        self.bracket_after_construct(outer)
    }

    fn handle_while(&mut self, node: Node<'a>, scope: ScopeId) -> Result<()> {
        let outer = self.enter_scope(scope, ScopeKind::ConstructOuter, lang::span(node));
        if let Some(cond) = node.child_by_field_name("condition") {
            self.rewrite_refs(cond)?;
        }
        self.walk_construct_body(node, outer)?;
        self.exit_scope(outer, false)?;
        self.bracket_after_construct(outer)
    }

    fn handle_do(&mut self, node: Node<'a>, scope: ScopeId) -> Result<()> {
        let outer = self.enter_scope(scope, ScopeKind::ConstructOuter, lang::span(node));
        self.walk_construct_body(node, outer)?;
        if let Some(cond) = node.child_by_field_name("condition") {
            self.rewrite_refs(cond)?;
        }
        self.exit_scope(outer, false)?;
        self.bracket_after_construct(outer)
    }

    fn handle_if(&mut self, node: Node<'a>, scope: ScopeId) -> Result<()> {
        let outer = self.enter_scope(scope, ScopeKind::ConstructOuter, lang::span(node));
        if let Some(cond) = node.child_by_field_name("condition") {
            self.rewrite_refs(cond)?;
        }

        // Both arms share the condition's prior; the else arm restarts the
        // tracker so then-branch yields are not on its chain.
        let branch_entry = self.current_yield;

        if let Some(consequence) = node.child_by_field_name("consequence") {
            self.walk_branch(consequence, outer)?;
        }
        if let Some(alternative) = node.child_by_field_name("alternative") {
            self.current_yield = branch_entry;
            // `else_clause` wraps the actual statement.
            let stmt = first_named_non_comment(alternative).unwrap_or(alternative);
            self.walk_branch(stmt, outer)?;
        }

        self.exit_scope(outer, false)?;
        self.bracket_after_construct(outer)
    }

    fn walk_branch(&mut self, node: Node<'a>, outer: ScopeId) -> Result<()> {
        if node.kind() == "compound_statement" {
            let inner = self.enter_scope(outer, ScopeKind::ConstructBody, lang::span(node));
            self.walk_block(node, inner)?;
            self.exit_scope(inner, true)
        } else {
            self.walk_statement(node, outer)
        }
    }

    fn walk_construct_body(&mut self, node: Node<'a>, outer: ScopeId) -> Result<()> {
        if let Some(body) = node.child_by_field_name("body") {
            self.walk_branch(body, outer)?;
        }
        Ok(())
    }

    fn handle_declaration(&mut self, node: Node<'a>, scope: ScopeId) -> Result<()> {
        let Some(type_node) = node.child_by_field_name("type") else {
            return self.rewrite_refs(node);
        };
        let base_ty = strip_class_keyword(lang::text(type_node, self.source));

        let mut parts: Vec<String> = Vec::new();
        for child in lang::children(node) {
            if !child.is_named() || child.id() == type_node.id() {
                continue;
            }
            let Some((name_node, derived, init)) = split_declarator(child) else {
                continue;
            };
            let name = lang::text(name_node, self.source).to_string();
            let ty = format!("{base_ty}{derived}");

            let constructed = !matches!(init, InitForm::None) || !is_builtin_type(&ty);
            let qualified = self.model.qualified(scope, &name);

            // Rewrite references inside the initializer before quoting it;
            // the declared name itself only becomes visible afterwards.
            let init_text = match &init {
                InitForm::None => None,
                InitForm::Assign(v) | InitForm::Parens(v) | InitForm::Braced(v) => {
                    self.rewrite_refs(*v)?;
                    Some(self.rewriter.text_for(lang::span(*v))?)
                }
            };

            let local = self.model.locals.len();
            self.model.locals.push(crate::analyze::model::Local {
                name: name.clone(),
                ty: ty.clone(),
                scope,
                yield_id: None,
                decl_span: lang::span(node),
                synthesized: false,
            });
            self.model.scopes[scope.0 as usize].has_locals = true;
            self.bindings
                .last_mut()
                .expect("binding frame")
                .insert(name, local);

            if constructed {
                let y = self.model.push_yield(
                    self.current_yield,
                    scope,
                    YieldKind::LocalInit { local },
                    lang::span(node),
                );
                self.model.locals[local].yield_id = Some(y);
                self.current_yield = y;

                parts.push(match (&init, init_text) {
                    (InitForm::Braced(_), Some(text)) => format!(
                        "::new (static_cast<void*>(&{qualified})) {ty}{text}, __state_ = {y}"
                    ),
                    (InitForm::Parens(_), Some(text)) => {
                        let args = text
                            .trim()
                            .trim_start_matches('(')
                            .trim_end_matches(')')
                            .trim();
                        if args.is_empty() {
                            format!("::__co_new(&{qualified}), __state_ = {y}")
                        } else {
                            format!("::__co_new(&{qualified}, {args}), __state_ = {y}")
                        }
                    }
                    (_, Some(text)) => {
                        format!("::__co_new(&{qualified}, {text}), __state_ = {y}")
                    }
                    (_, None) => format!("::__co_new(&{qualified}), __state_ = {y}"),
                });
            }
        }

        let replacement = if parts.is_empty() {
            ";".to_string()
        } else {
            format!("{};", parts.join(", "))
        };
        self.rewriter.replace(lang::span(node), replacement)?;
        Ok(())
    }

    /// Analyzer-stage reference rewriting over one expression or statement.
    fn rewrite_refs(&mut self, node: Node<'a>) -> Result<()> {
        for n in lang::descendants(node) {
            if self.inside_nested_lambda(n) {
                continue;
            }
            match n.kind() {
                "identifier" => {
                    let name = lang::text(n, self.source);
                    if name == LAMBDA_THIS {
                        self.rewriter.replace(lang::span(n), "this")?;
                    } else if let Some(local) = self.lookup(name) {
                        let scope = self.model.locals[local].scope;
                        let lname = self.model.locals[local].name.clone();
                        let qualified = self.model.qualified(scope, &lname);
                        self.rewriter.replace(lang::span(n), qualified)?;
                    }
                }
                "this" => {
                    if self.model.uses_this {
                        self.rewriter
                            .replace(lang::span(n), "__captures_.__this_")?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn inside_nested_lambda(&self, node: Node<'_>) -> bool {
        let mut cur = node.parent();
        while let Some(n) = cur {
            if n.id() == self.body.id() {
                return false;
            }
            if n.kind() == "lambda_expression" {
                return true;
            }
            cur = n.parent();
        }
        false
    }

    /// Replace capture references with access through the capture record,
    /// for quoting into member functions other than the call operator.
    fn qualify_captures(&self, expr: &str) -> String {
        rewrite_identifiers(expr, |name, after_access| {
            if after_access {
                return None;
            }
            self.capture_aliases
                .contains_key(name)
                .then(|| format!("__captures_.{name}"))
        })
    }

    /// Spell `expr` so its decltype is valid at struct scope: captures,
    /// locals and parameters become unevaluated lvalue makers of their
    /// transported types.
    fn type_context_expr(&self, arg: Node<'a>) -> String {
        let text = lang::text(arg, self.source);
        rewrite_identifiers(text, |name, after_access| {
            if after_access {
                return None;
            }
            if name == "this" {
                let alias = self.this_alias.as_ref()?;
                return Some(format!("::__co_lval<{alias}>()"));
            }
            if let Some(local) = self.lookup(name) {
                return Some(format!("::__co_lval<{}>()", self.model.locals[local].ty));
            }
            if let Some(alias) = self.capture_aliases.get(name) {
                return Some(format!("::__co_lval<{alias}>()"));
            }
            if let Some(p) = self
                .params
                .iter()
                .find(|p| p.name.as_deref() == Some(name))
            {
                return Some(format!("::__co_lval<{}>()", p.ty.trim_end_matches('&')));
            }
            None
        })
    }
}

/// Token-level identifier rewriting: calls `f(name, after_access)` for each
/// identifier, where `after_access` is true following `.`, `->` or `::`.
fn rewrite_identifiers(text: &str, f: impl Fn(&str, bool) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_access = false;
    for tok in lex(text) {
        let t = tok.text(text);
        if tok.kind == Tok::Ident {
            match f(t, prev_access) {
                Some(replacement) => out.push_str(&replacement),
                None => out.push_str(t),
            }
        } else {
            out.push_str(t);
        }
        if !tok.kind.is_trivia() {
            prev_access = matches!(tok.kind, Tok::Arrow | Tok::ColonColon)
                || (tok.kind == Tok::Op && t == ".");
        }
    }
    out
}

fn callee_name<'s>(call: Node<'s>, source: &'s str) -> Option<&'s str> {
    let callee = call.child_by_field_name("function")?;
    (callee.kind() == "identifier").then(|| lang::text(callee, source))
}

/// First named child that is not a comment.
fn first_named_non_comment<'t>(node: Node<'t>) -> Option<Node<'t>> {
    (0..node.named_child_count())
        .filter_map(|i| node.named_child(i as u32))
        .find(|n| n.kind() != "comment")
}

fn sole_argument<'t>(call: Node<'t>) -> Option<Node<'t>> {
    let args = call.child_by_field_name("arguments")?;
    args.named_child(0)
}

/// Whether a delegation argument names an existing generator lvalue rather
/// than materializing a temporary.
fn is_lvalue_generator(arg: Node<'_>) -> bool {
    match arg.kind() {
        "identifier" | "field_expression" | "qualified_identifier" | "subscript_expression" => {
            true
        }
        "parenthesized_expression" => arg
            .named_child(0)
            .is_some_and(|inner| is_lvalue_generator(inner)),
        _ => false,
    }
}

fn split_declarator(node: Node<'_>) -> Option<(Node<'_>, String, InitForm<'_>)> {
    match node.kind() {
        "identifier" => Some((node, String::new(), InitForm::None)),
        "init_declarator" => {
            let inner = node.child_by_field_name("declarator")?;
            let (name, derived, _) = split_declarator(inner)?;
            let value = node.child_by_field_name("value")?;
            let form = match value.kind() {
                "initializer_list" => InitForm::Braced(value),
                "argument_list" => InitForm::Parens(value),
                _ => InitForm::Assign(value),
            };
            Some((name, derived, form))
        }
        "pointer_declarator" => {
            let inner = node.child_by_field_name("declarator")?;
            let (name, derived, form) = split_declarator(inner)?;
            Some((name, format!("*{derived}"), form))
        }
        // `T x(args);` parses as a function declarator; inside a lambda body
        // we read it as direct initialization.
        "function_declarator" => {
            let inner = node.child_by_field_name("declarator")?;
            let (name, derived, _) = split_declarator(inner)?;
            let args = node.child_by_field_name("parameters")?;
            Some((name, derived, InitForm::Parens(args)))
        }
        _ => None,
    }
}

fn strip_class_keyword(ty: &str) -> String {
    ty.trim()
        .strip_prefix("class ")
        .or_else(|| ty.trim().strip_prefix("struct "))
        .unwrap_or(ty.trim())
        .to_string()
}

fn is_builtin_type(ty: &str) -> bool {
    if ty.contains('*') {
        return true;
    }
    let cleaned = ty.replace('&', " ");
    cleaned
        .split_whitespace()
        .all(|word| BUILTIN_TYPE_WORDS.contains(&word))
}

fn find_child_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    lang::children(node).into_iter().find(|c| c.kind() == kind)
}

/// First descendant of `kind` not inside the body subtree.
fn find_descendant_kind<'t>(node: Node<'t>, kind: &str, body: Node<'t>) -> Option<Node<'t>> {
    lang::descendants(node).into_iter().find(|n| {
        n.kind() == kind && {
            let mut cur = Some(*n);
            while let Some(c) = cur {
                if c.id() == body.id() {
                    return false;
                }
                cur = c.parent();
            }
            true
        }
    })
}

/// The `initializer(<lambda>)` call directly enclosing a lambda, if any.
fn enclosing_initializer_call<'t>(lambda: Node<'t>, source: &str) -> Option<Node<'t>> {
    let args = lambda.parent().filter(|p| p.kind() == "argument_list")?;
    let call = args.parent().filter(|p| p.kind() == "call_expression")?;
    (callee_name(call, source) == Some("initializer")).then_some(call)
}
