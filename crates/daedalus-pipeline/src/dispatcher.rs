//! The request dispatcher.
//!
//! A [`Dispatcher`] owns one service together with its attached actions and
//! collaborators. Each call walks the fixed [`Step`] sequence, runs the
//! resolved method and renders the outcome as an [`Envelope`]. Caller errors
//! roll back any open transaction and are reported with their code; internal
//! errors and panics go through the [`ErrorHook`].
//!
//! # Example
//!
//! ```ignore
//! use daedalus_pipeline::{Dispatcher, InboundCall};
//!
//! let dispatcher = Dispatcher::builder(UserDirectory::default())
//!     .attach("export", ExportUsers)
//!     .build();
//! dispatcher.verify()?;
//!
//! let reply = dispatcher.handle(InboundCall::post("get-user", r#"{"userId": 2}"#));
//! ```

use crate::call::InboundCall;
use crate::envelope::{Envelope, Reply};
use crate::hook::{ErrorHook, FaultReport};
use crate::normalize::after_call;
use crate::ping::{PingAction, PING_ACTION};
use crate::step::Step;
use bytes::Bytes;
use daedalus_config::ServiceSection;
use daedalus_core::naming::route_to_method;
use daedalus_core::{
    ActionMap, ActionObject, AllowAll, Arguments, Authorizer, CallContext, ContractCache, ErrorCategory,
    IdentityPermissions, MethodContract, MethodDescriptor, PassthroughTranslator,
    PermissionOracle, RequestContext, RpcError, RpcResult, RpcService, ServiceInfo,
    TransactionManager, TransactionSlot, Translator, ValidatorRegistry,
};
use daedalus_docs::{describe, render_docs, DocsError, ServiceDefinition};
use daedalus_telemetry::{record_call, CallOutcome};
use serde_json::{Map, Value};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

/// Utility action returning the service definition.
pub const DEFINITION_ACTION: &str = "definition";

/// Utility action returning the plain-text documentation page.
pub const DOCUMENTATION_ACTION: &str = "documentation";

/// Utility action reporting the most recent fault.
pub const HANDLE_ERROR_ACTION: &str = "handle-error";

/// Dispatcher policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Reject calls that did not arrive over a secure channel.
    pub force_secure: bool,
    /// Re-extract contracts on every call and show fault details.
    pub debug: bool,
    /// Overrides the service's stateless flag.
    pub stateless: Option<bool>,
    /// Authenticate by caller identity.
    pub identity_mode: bool,
    /// Reject empty request bodies.
    pub reject_empty_body: bool,
    /// Show fault details outside debug mode.
    pub expose_internal_errors: bool,
    /// Lifetime of cached contracts.
    pub contract_ttl: Duration,
}

impl DispatchOptions {
    /// Builds options from the `[service]` configuration section.
    #[must_use]
    pub fn from_section(section: &ServiceSection) -> Self {
        Self {
            force_secure: section.force_secure_connection,
            debug: section.debug,
            stateless: section.stateless,
            identity_mode: section.identity_mode,
            reject_empty_body: section.reject_empty_body,
            expose_internal_errors: section.expose_internal_errors,
            contract_ttl: Duration::from_secs(section.contract_cache_ttl_secs),
        }
    }
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self::from_section(&ServiceSection::default())
    }
}

/// What an action id resolved to.
enum Target {
    Inline(MethodDescriptor),
    Attached(Arc<dyn ActionObject>, MethodDescriptor),
}

impl Target {
    fn descriptor(&self) -> &MethodDescriptor {
        match self {
            Self::Inline(method) | Self::Attached(_, method) => method,
        }
    }
}

/// Dispatches calls to one service.
pub struct Dispatcher {
    service: Arc<dyn RpcService>,
    info: ServiceInfo,
    actions: ActionMap,
    authorizer: Arc<dyn Authorizer>,
    permissions: Arc<dyn PermissionOracle>,
    validators: ValidatorRegistry,
    translator: Arc<dyn Translator>,
    transactions: Option<Arc<dyn TransactionManager>>,
    cache: ContractCache,
    options: DispatchOptions,
    hook: ErrorHook,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("service", &self.info.name)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Starts building a dispatcher for `service`.
    #[must_use]
    pub fn builder<S: RpcService>(service: S) -> DispatcherBuilder {
        DispatcherBuilder::new(Arc::new(service))
    }

    /// Returns the service identity.
    #[must_use]
    pub const fn service_info(&self) -> &ServiceInfo {
        &self.info
    }

    /// Returns the dispatcher policy.
    #[must_use]
    pub const fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Returns the attached actions, including the built-in ping.
    #[must_use]
    pub const fn actions(&self) -> &ActionMap {
        &self.actions
    }

    /// Returns the most recent fault handled by the error hook.
    #[must_use]
    pub fn last_fault(&self) -> Option<FaultReport> {
        self.hook.last_fault()
    }

    /// Builds the service definition.
    ///
    /// # Errors
    ///
    /// Fails when a contract cannot be extracted or an attached action has
    /// no public entry point.
    pub fn definition(&self) -> Result<ServiceDefinition, DocsError> {
        describe(self.service.as_ref(), &self.actions, &self.cache)
    }

    /// Checks every exposed contract and every validator it names.
    ///
    /// Run at startup to surface contract mismatches and unknown validators
    /// before the first call does.
    ///
    /// # Errors
    ///
    /// Returns the first failure found: [`RpcError::NoRunMethod`],
    /// [`RpcError::ContractMismatch`] or [`RpcError::ValidatorNotFound`].
    pub fn verify(&self) -> RpcResult<()> {
        let mut targets = Vec::new();
        for (id, action) in &self.actions {
            let entry = action
                .entry()
                .filter(|entry| entry.public)
                .ok_or_else(|| RpcError::NoRunMethod { action: id.clone() })?;
            targets.push((action.type_name().to_string(), entry));
        }
        for method in self.service.methods() {
            let shadowed = method
                .route_id()
                .map_or(true, |id| self.actions.contains_key(&id));
            if method.public && !shadowed {
                targets.push((self.info.name.clone(), method));
            }
        }

        for (type_id, method) in &targets {
            let contract = match self.cache.resolve_method(type_id, method) {
                Ok(contract) => contract,
                Err(RpcError::NoDocumentation { .. }) => continue,
                Err(e) => return Err(e),
            };
            let missing = contract
                .validators()
                .find(|(_, validator)| !self.validators.contains(validator))
                .map(|(_, validator)| validator.to_string());
            if let Some(validator) = missing {
                return Err(RpcError::ValidatorNotFound { validator });
            }
        }

        tracing::debug!(service = %self.info.name, methods = targets.len(), "contracts verified");
        Ok(())
    }

    /// Dispatches an HTTP request addressed below the service's base route.
    #[must_use]
    pub fn dispatch(&self, request: http::Request<Bytes>) -> http::Response<Bytes> {
        let call = InboundCall::from_http(request, &self.info.base_route);
        self.handle(call).into_response()
    }

    /// Handles one call.
    ///
    /// Never fails: every outcome, panics included, becomes a reply.
    pub fn handle(&self, call: InboundCall) -> Reply {
        let action = call.action.trim_matches('/').to_string();
        let mut ctx = CallContext::new(action.clone()).with_identity(call.identity.clone());
        if let Some(manager) = &self.transactions {
            ctx = ctx.with_transaction(TransactionSlot::new(Arc::clone(manager)));
        }

        let span = tracing::info_span!("rpc_call", request_id = %ctx.request_id(), action = %action);
        let _enter = span.enter();

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run(&call, &mut ctx)));

        let (reply, outcome) = match result {
            Ok(Ok(reply)) => {
                let outcome = match reply.envelope() {
                    Some(envelope) if envelope.has_errors() => CallOutcome::Rejected,
                    _ => CallOutcome::Success,
                };
                (reply, outcome)
            }
            Ok(Err(error)) => self.fail(&mut ctx, &error, &call.body),
            Err(payload) => {
                ctx.transaction_mut().rollback();
                let entry =
                    self.hook
                        .on_panic(&ctx, payload.as_ref(), &call.body, self.translator.as_ref());
                ctx.push_error(entry);
                let envelope = Envelope::failure(ctx.errors().to_vec());
                (Reply::Envelope(envelope), CallOutcome::Fault)
            }
        };

        record_call(&action, outcome, ctx.elapsed());
        tracing::debug!(outcome = outcome.as_str(), "call finished");
        reply
    }

    fn fail(&self, ctx: &mut CallContext, error: &RpcError, body: &[u8]) -> (Reply, CallOutcome) {
        ctx.transaction_mut().rollback();
        let (entry, outcome) = match call_outcome(error.category()) {
            CallOutcome::Fault => {
                let entry = self.hook.on_error(ctx, error, body, self.translator.as_ref());
                (entry, CallOutcome::Fault)
            }
            outcome => {
                log_rejection(ctx, error);
                (error.to_entry(self.translator.as_ref()), outcome)
            }
        };
        ctx.push_error(entry);
        (Reply::Envelope(Envelope::failure(ctx.errors().to_vec())), outcome)
    }

    fn run(&self, call: &InboundCall, ctx: &mut CallContext) -> RpcResult<Reply> {
        enter(Step::Bypass);
        if let Some(reply) = self.bypass(ctx.action())? {
            return Ok(reply);
        }

        enter(Step::Transport);
        if self.options.force_secure && !call.secure {
            return Err(RpcError::NotSecure);
        }
        if call.method != http::Method::POST {
            return Err(RpcError::NotPost);
        }

        enter(Step::Target);
        let target = self.resolve_target(ctx.action())?;

        enter(Step::Body);
        ctx.set_request(RequestContext::parse(&call.body, self.options.reject_empty_body)?);

        enter(Step::Contract);
        let contract = match &target {
            Target::Inline(method) => self.cache.resolve_method(&self.info.name, method)?,
            Target::Attached(action, entry) => self.cache.resolve_method(action.type_name(), entry)?,
        };

        enter(Step::Exposure);
        if !contract.requires_api {
            return Err(RpcError::NotApiEnabled {
                method: target.descriptor().name.to_string(),
            });
        }

        enter(Step::Authorization);
        if contract.requires_auth {
            self.authorize(&contract, ctx)?;
        }

        enter(Step::Parameters);
        let mut args = self.bind(&contract, ctx, &call.route_args)?;

        enter(Step::Transaction);
        if contract.requires_transaction {
            ctx.transaction_mut().acquire()?;
        }

        let raw = match &target {
            Target::Inline(method) => self.service.invoke(method.name, ctx, &mut args)?,
            Target::Attached(action, _) => action.run(ctx, &mut args)?,
        };

        let fields = after_call(&contract, raw, ctx)?;
        Ok(Reply::Envelope(Envelope::new(fields, ctx.errors().to_vec())))
    }

    fn bypass(&self, action: &str) -> RpcResult<Option<Reply>> {
        match action {
            "" | DEFINITION_ACTION => {
                let document = self
                    .definition()
                    .and_then(|definition| definition.methods_document())
                    .map_err(docs_error)?;
                let fields = match document {
                    Value::Object(fields) => fields,
                    _ => Map::new(),
                };
                Ok(Some(Reply::Envelope(Envelope::success(fields))))
            }
            DOCUMENTATION_ACTION => {
                let definition = self.definition().map_err(docs_error)?;
                Ok(Some(Reply::Text(render_docs(&definition))))
            }
            HANDLE_ERROR_ACTION => {
                let envelope = self.hook.last_fault().map_or_else(
                    || Envelope::success(Map::new()),
                    |fault| Envelope::failure(vec![fault.entry]),
                );
                Ok(Some(Reply::Envelope(envelope)))
            }
            _ => Ok(None),
        }
    }

    fn resolve_target(&self, id: &str) -> RpcResult<Target> {
        if let Some(action) = self.actions.get(id) {
            let entry = action
                .entry()
                .filter(|entry| entry.public)
                .ok_or_else(|| RpcError::NoRunMethod {
                    action: id.to_string(),
                })?;
            return Ok(Target::Attached(Arc::clone(action), entry));
        }

        route_to_method(id)
            .and_then(|name| self.service.method(&name))
            .filter(|method| method.public)
            .map(Target::Inline)
            .ok_or_else(|| RpcError::WrongActionType {
                action: id.to_string(),
            })
    }

    fn authorize(&self, contract: &MethodContract, ctx: &CallContext) -> RpcResult<()> {
        let stateless = self
            .options
            .stateless
            .unwrap_or_else(|| self.service.is_stateless());
        let authenticated =
            self.authorizer
                .check_auth(stateless, ctx.action(), ctx.request().as_map());

        // In identity mode the caller identity decides and permissions are not consulted.
        if self.options.identity_mode {
            return if ctx.identity().user_id().is_some() {
                Ok(())
            } else {
                Err(RpcError::NotLoggedIn)
            };
        }

        if !authenticated {
            return Err(RpcError::NotLoggedIn);
        }
        if let Some(permission) = &contract.permission {
            if !self.permissions.has_permission(ctx.identity(), permission) {
                return Err(RpcError::AccessDenied {
                    permission: permission.clone(),
                });
            }
        }
        Ok(())
    }

    fn bind(
        &self,
        contract: &MethodContract,
        ctx: &CallContext,
        route_args: &Map<String, Value>,
    ) -> RpcResult<Arguments> {
        let mut args = Arguments::from_map(route_args.clone());

        for (name, spec) in &contract.params {
            let supplied = ctx.request().get(name).or_else(|| route_args.get(name));
            match supplied {
                Some(value) => {
                    if let Some(validator) = spec.validator.as_deref() {
                        if !self.validators.validate(validator, value)? {
                            return Err(RpcError::ParamNotValid {
                                param: name.clone(),
                                validator: validator.to_string(),
                            });
                        }
                    }
                    args.insert(name.clone(), value.clone());
                }
                None if spec.required => {
                    return Err(RpcError::ParamNotFound {
                        param: name.clone(),
                    })
                }
                None => args.insert(name.clone(), spec.default.clone().unwrap_or(Value::Null)),
            }
        }

        Ok(args)
    }
}

fn call_outcome(category: ErrorCategory) -> CallOutcome {
    if category.is_caller_error() {
        CallOutcome::Rejected
    } else {
        CallOutcome::Fault
    }
}

/// Broken service definitions log at error level, business errors at info.
fn rejection_level(category: ErrorCategory) -> Level {
    match category {
        ErrorCategory::Contract => Level::ERROR,
        ErrorCategory::Service => Level::INFO,
        _ => Level::WARN,
    }
}

fn log_rejection(ctx: &CallContext, error: &RpcError) {
    let level = rejection_level(error.category());
    let caller = ctx.identity().log_id();
    if level == Level::ERROR {
        tracing::error!(error_code = error.code(), category = ?error.category(), caller = %caller, "{error}");
    } else if level == Level::INFO {
        tracing::info!(error_code = error.code(), category = ?error.category(), caller = %caller, "{error}");
    } else {
        tracing::warn!(error_code = error.code(), category = ?error.category(), caller = %caller, "{error}");
    }
}

fn enter(step: Step) {
    tracing::debug!(step = step.name(), "entering step");
}

fn docs_error(error: DocsError) -> RpcError {
    match error {
        DocsError::Contract { source, .. } => source,
        other => RpcError::internal_with_source("failed to describe service", other),
    }
}

/// Builder for [`Dispatcher`].
#[must_use]
pub struct DispatcherBuilder {
    service: Arc<dyn RpcService>,
    actions: ActionMap,
    authorizer: Arc<dyn Authorizer>,
    permissions: Arc<dyn PermissionOracle>,
    validators: ValidatorRegistry,
    translator: Arc<dyn Translator>,
    transactions: Option<Arc<dyn TransactionManager>>,
    cache: ContractCache,
    options: DispatchOptions,
}

impl DispatcherBuilder {
    /// Creates a builder with allow-all authorization, identity-based
    /// permissions, the built-in validators and pass-through messages.
    pub fn new(service: Arc<dyn RpcService>) -> Self {
        Self {
            service,
            actions: ActionMap::new(),
            authorizer: Arc::new(AllowAll),
            permissions: Arc::new(IdentityPermissions),
            validators: ValidatorRegistry::with_builtins(),
            translator: Arc::new(PassthroughTranslator),
            transactions: None,
            cache: ContractCache::new(),
            options: DispatchOptions::default(),
        }
    }

    /// Attaches an action object under an action id.
    pub fn attach<A: ActionObject + 'static>(mut self, id: impl Into<String>, action: A) -> Self {
        self.actions.insert(id.into(), Arc::new(action));
        self
    }

    /// Sets the authorizer.
    pub fn authorizer<A: Authorizer + 'static>(mut self, authorizer: A) -> Self {
        self.authorizer = Arc::new(authorizer);
        self
    }

    /// Sets the permission oracle.
    pub fn permissions<P: PermissionOracle + 'static>(mut self, permissions: P) -> Self {
        self.permissions = Arc::new(permissions);
        self
    }

    /// Replaces the validator registry.
    pub fn validators(mut self, validators: ValidatorRegistry) -> Self {
        self.validators = validators;
        self
    }

    /// Sets the message translator.
    pub fn translator<T: Translator + 'static>(mut self, translator: T) -> Self {
        self.translator = Arc::new(translator);
        self
    }

    /// Sets the transaction manager.
    pub fn transactions(mut self, manager: Arc<dyn TransactionManager>) -> Self {
        self.transactions = Some(manager);
        self
    }

    /// Replaces the contract cache.
    pub fn cache(mut self, cache: ContractCache) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the dispatcher policy.
    pub fn options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the dispatcher policy from the `[service]` section.
    pub fn config(self, section: &ServiceSection) -> Self {
        self.options(DispatchOptions::from_section(section))
    }

    /// Builds the dispatcher.
    ///
    /// The built-in `ping` action is added unless the service or an
    /// attached action already answers `ping`.
    #[must_use]
    pub fn build(mut self) -> Dispatcher {
        let has_own_ping = self.actions.contains_key(PING_ACTION)
            || self
                .service
                .methods()
                .iter()
                .any(|m| m.route_id().as_deref() == Some(PING_ACTION));
        if !has_own_ping {
            self.actions
                .insert(PING_ACTION.to_string(), Arc::new(PingAction));
        }

        let cache = self
            .cache
            .with_debug(self.options.debug)
            .with_ttl(self.options.contract_ttl);
        let hook = ErrorHook::new(self.options.debug, self.options.expose_internal_errors);
        let info = self.service.service_info();

        tracing::info!(
            service = %info.name,
            base_route = %info.base_route,
            actions = self.actions.len(),
            "dispatcher ready"
        );

        Dispatcher {
            service: self.service,
            info,
            actions: self.actions,
            authorizer: self.authorizer,
            permissions: self.permissions,
            validators: self.validators,
            translator: self.translator,
            transactions: self.transactions,
            cache,
            options: self.options,
            hook,
        }
    }
}
