//! The scope-and-yield model built per resumable lambda.
//!
//! The analyzer owns all storage; cross-references are integer ids so the
//! code generator can read the model without aliasing concerns. Yield ids
//! form a dense sequence 1..N; 0 is "not yet started" and -1 "terminated".

use indexmap::IndexSet;

use coropp_core::Span;

/// State value of the generated machine. Positive values are yield points.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YieldId(pub i32);

impl YieldId {
    pub const INITIAL: YieldId = YieldId(0);
    pub const TERMINAL: YieldId = YieldId(-1);
}

impl std::fmt::Debug for YieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "y{}", self.0)
    }
}

impl std::fmt::Display for YieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into the scope arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The lambda body itself; locals here are direct fields of the union.
    Body,
    /// A braced block.
    Compound,
    /// Synthetic outer scope of `for`/`while`/`if`; loop-header locals live
    /// here so they survive across iterations.
    ConstructOuter,
    /// Body scope of a loop or an `if` arm.
    ConstructBody,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    /// Id unique among siblings; forms the scope path, hence the nested
    /// union names.
    pub sub_id: u32,
    pub kind: ScopeKind,
    pub span: Span,
    /// Enclosing-scope yield at entry; the unwind target when the scope is
    /// left normally.
    pub entry_yield: YieldId,
    /// Whether any local was introduced strictly within this scope.
    pub has_locals: bool,
}

/// How a capture transports its value into the generated struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureForm {
    ByValue,
    ByRef,
    Init { initializer: String },
    This,
}

#[derive(Debug, Clone)]
pub struct Capture {
    pub form: CaptureForm,
    /// Original name; `None` only for the this-capture.
    pub name: Option<String>,
}

impl Capture {
    /// Member name inside the capture record.
    pub fn member(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => "__this_".to_string(),
        }
    }

    /// Name of the transported-type alias.
    pub fn alias(&self, index: usize) -> String {
        match &self.name {
            Some(name) => format!("__capture{index}_{name}_t"),
            None => format!("__capture{index}_this_t"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Local {
    pub name: String,
    /// Declared type text, leading `class `/`struct ` stripped. For
    /// synthesized sub-generator storage this is the struct-scope alias.
    pub ty: String,
    pub scope: ScopeId,
    /// Yield at which the local becomes live; `None` for raw storage
    /// (uninitialized builtin declarations).
    pub yield_id: Option<YieldId>,
    pub decl_span: Span,
    pub synthesized: bool,
}

/// Sub-generator of a `yield from` / `return from` delegation.
#[derive(Debug, Clone)]
pub struct SubGen {
    /// Expression as quoted into the dispatcher (locals qualified, captures
    /// bound at operator() entry).
    pub expr: String,
    /// Same expression valid in other member functions (captures qualified
    /// through the capture record).
    pub expr_member: String,
    /// Synthesized local index when the sub-generator materialized a
    /// temporary; `None` when it names an existing lvalue.
    pub inline_local: Option<usize>,
    /// Yield id marking the synthesized local live (the extra case label).
    pub live_yield: Option<YieldId>,
    /// Materializing expression for the synthesized local's placement
    /// construction; `None` for lvalue sub-generators.
    pub init: Option<String>,
}

#[derive(Debug, Clone)]
pub enum YieldKind {
    /// Initialized (or class-type default-initialized) local declaration.
    /// The declaration rewrite itself was emitted by the analyzer.
    LocalInit { local: usize },
    /// Synthesized sub-generator storage became live; precedes its
    /// delegation's resume yield on the prior chain.
    SubLive { local: usize },
    /// `yield E` with the already-rewritten expression text.
    Value { expr: String },
    /// `yield from G` resumption point.
    Delegate { sub: SubGen },
    /// `return from G` resumption point.
    TailDelegate { sub: SubGen },
    /// `break_resumable` / `co_yield` suspension with no value.
    Suspend,
}

#[derive(Debug, Clone)]
pub struct YieldPoint {
    pub id: YieldId,
    /// The enclosing scope's most recent prior yield.
    pub prior: YieldId,
    pub scope: ScopeId,
    pub kind: YieldKind,
    /// Statement to replace with the dispatcher expansion (unused for
    /// `LocalInit`, whose statement the analyzer already rewrote).
    pub stmt_span: Span,
}

/// Complete model of one resumable lambda, consumed once by the generator.
#[derive(Debug, Clone)]
pub struct LambdaModel {
    pub id: u32,
    pub captures: Vec<Capture>,
    /// Parameter list text including parentheses.
    pub params: String,
    /// Explicit trailing return type, if the user wrote one.
    pub return_type: Option<String>,
    pub scopes: Vec<Scope>,
    pub locals: Vec<Local>,
    pub yields: Vec<YieldPoint>,
    /// (ancestor, descendant) pairs of the prior-yield relation's closure:
    /// the local first live at `ancestor` is constructed at `descendant`.
    pub reachable: IndexSet<(YieldId, YieldId)>,
    /// Struct-scope typedefs for synthesized sub-generator storage:
    /// `(alias, decltype expression)`.
    pub sub_aliases: Vec<(String, String)>,
    /// First value-producing expression in source order, used to spell the
    /// deduced default result.
    pub first_value_expr: Option<String>,
    pub lambda_span: Span,
    pub body_span: Span,
    /// Span to replace; differs from `lambda_span` when the lambda is the
    /// direct argument of `initializer(...)`.
    pub replace_span: Span,
    pub as_initializer: bool,
    pub uses_this: bool,
}

impl LambdaModel {
    pub fn new(id: u32, lambda_span: Span, body_span: Span) -> Self {
        Self {
            id,
            captures: Vec::new(),
            params: "()".to_string(),
            return_type: None,
            scopes: Vec::new(),
            locals: Vec::new(),
            yields: Vec::new(),
            reachable: IndexSet::new(),
            sub_aliases: Vec::new(),
            first_value_expr: None,
            lambda_span,
            body_span,
            replace_span: lambda_span,
            as_initializer: false,
            uses_this: false,
        }
    }

    pub fn struct_name(&self) -> String {
        format!("__resumable_lambda_{}", self.id)
    }

    pub fn factory_name(&self) -> String {
        format!("__resumable_lambda_{}_factory", self.id)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// Allocate a scope; the root body scope must be pushed first.
    pub fn push_scope(
        &mut self,
        parent: Option<ScopeId>,
        kind: ScopeKind,
        span: Span,
        entry_yield: YieldId,
    ) -> ScopeId {
        let sub_id = match parent {
            Some(p) => {
                1 + self
                    .scopes
                    .iter()
                    .filter(|s| s.parent == Some(p))
                    .count() as u32
            }
            None => 0,
        };
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            sub_id,
            kind,
            span,
            entry_yield,
            has_locals: false,
        });
        id
    }

    /// Scope path from the body root (exclusive) down to `scope`.
    pub fn scope_path(&self, scope: ScopeId) -> Vec<u32> {
        let mut path = Vec::new();
        let mut cur = Some(scope);
        while let Some(id) = cur {
            let s = self.scope(id);
            if s.parent.is_some() {
                path.push(s.sub_id);
            }
            cur = s.parent;
        }
        path.reverse();
        path
    }

    /// Qualified name of a local inside the locals union, e.g.
    /// `__locals_.__s1.__s2.name`.
    pub fn qualified(&self, scope: ScopeId, name: &str) -> String {
        let mut out = String::from("__locals_");
        for sub in self.scope_path(scope) {
            out.push_str(&format!(".__s{sub}"));
        }
        out.push('.');
        out.push_str(name);
        out
    }

    /// Allocate the next yield id with the given prior, maintaining the
    /// reachability closure incrementally.
    pub fn push_yield(
        &mut self,
        prior: YieldId,
        scope: ScopeId,
        kind: YieldKind,
        stmt_span: Span,
    ) -> YieldId {
        let id = YieldId(self.yields.len() as i32 + 1);
        // Every ancestor on the prior chain reaches the new yield.
        let mut cur = prior;
        while cur != YieldId::INITIAL {
            self.reachable.insert((cur, id));
            cur = self.prior_of(cur);
        }
        self.yields.push(YieldPoint {
            id,
            prior,
            scope,
            kind,
            stmt_span,
        });
        id
    }

    pub fn yield_point(&self, id: YieldId) -> &YieldPoint {
        &self.yields[(id.0 - 1) as usize]
    }

    pub fn prior_of(&self, id: YieldId) -> YieldId {
        if id == YieldId::INITIAL {
            YieldId::INITIAL
        } else {
            self.yield_point(id).prior
        }
    }

    /// Local owned by a yield, if the yield marks a construction.
    pub fn local_owned_by(&self, id: YieldId) -> Option<usize> {
        match &self.yield_point(id).kind {
            YieldKind::LocalInit { local } | YieldKind::SubLive { local } => Some(*local),
            _ => None,
        }
    }

    /// The prior chain from `state` to the root, inclusive of `state`.
    pub fn prior_chain(&self, state: YieldId) -> Vec<YieldId> {
        let mut chain = Vec::new();
        let mut cur = state;
        while cur != YieldId::INITIAL {
            chain.push(cur);
            cur = self.prior_of(cur);
        }
        chain
    }

    /// Locals constructed when the machine is suspended at `state`, in
    /// construction (root-first) order.
    pub fn live_locals_at(&self, state: YieldId) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .prior_chain(state)
            .into_iter()
            .filter_map(|y| self.local_owned_by(y))
            .collect();
        out.reverse();
        out
    }

    /// Unique local type expressions, in declaration order. Feeds the
    /// copy/move constructibility conjunctions.
    pub fn local_type_list(&self) -> Vec<String> {
        let mut seen = IndexSet::new();
        for local in &self.locals {
            seen.insert(local.ty.clone());
        }
        seen.into_iter().collect()
    }

    pub fn has_sub_generators(&self) -> bool {
        self.yields.iter().any(|y| {
            matches!(
                y.kind,
                YieldKind::Delegate { .. } | YieldKind::TailDelegate { .. }
            )
        })
    }

    /// Dense-id invariant: ids are exactly 1..=N in order.
    pub fn yield_ids_are_dense(&self) -> bool {
        self.yields
            .iter()
            .enumerate()
            .all(|(i, y)| y.id == YieldId(i as i32 + 1))
    }
}
