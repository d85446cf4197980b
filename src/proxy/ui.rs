//! UI component proxy.
//!
//! Translates inbound `UI.*` requests into actions on explicit per-app
//! state and answers each with exactly one response, except for the
//! interactions whose result is produced by a later user action (alert,
//! slider, choice interaction, audio pass-thru). Those record the request
//! id in the deferred store and are resolved through the completion entry
//! points below.
//!
//! On registration the proxy subscribes to the voice-recognition choice
//! topic; a `VR.OnChoice` notification received while that subscription is
//! active completes a deferred `UI.PerformInteraction`.

use serde_json::{json, Value};
use std::collections::HashMap;

use crate::error::{BuslinkError, Result};
use crate::handler::{
    DeferredReplies, DispatchTable, Dispatched, SessionContext, UnknownMethodPolicy,
};
use crate::observer::RpcObserver;
use crate::protocol::{Notification, Request, ResultCode};

/// Voice-recognition choice topic this proxy subscribes to.
pub const VR_ON_CHOICE: &str = "VR.OnChoice";

/// Per-application UI state: the commands, submenus, and choice sets the
/// core has pushed for one app.
#[derive(Debug, Default)]
pub struct AppModel {
    commands: HashMap<u64, Value>,
    submenus: HashMap<u64, Value>,
    choice_sets: HashMap<u64, Value>,
    show: Option<Value>,
    media_clock: Option<Value>,
}

impl AppModel {
    pub fn add_command(&mut self, cmd_id: u64, params: Value) -> ResultCode {
        self.commands.insert(cmd_id, params);
        ResultCode::Success
    }

    pub fn delete_command(&mut self, cmd_id: u64) -> ResultCode {
        match self.commands.remove(&cmd_id) {
            Some(_) => ResultCode::Success,
            None => ResultCode::InvalidId,
        }
    }

    pub fn add_submenu(&mut self, menu_id: u64, params: Value) -> ResultCode {
        self.submenus.insert(menu_id, params);
        ResultCode::Success
    }

    pub fn delete_submenu(&mut self, menu_id: u64) -> ResultCode {
        match self.submenus.remove(&menu_id) {
            Some(_) => ResultCode::Success,
            None => ResultCode::InvalidId,
        }
    }

    pub fn create_choice_set(&mut self, set_id: u64, params: Value) -> ResultCode {
        self.choice_sets.insert(set_id, params);
        ResultCode::Success
    }

    pub fn delete_choice_set(&mut self, set_id: u64) -> ResultCode {
        match self.choice_sets.remove(&set_id) {
            Some(_) => ResultCode::Success,
            None => ResultCode::InvalidId,
        }
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn has_command(&self, cmd_id: u64) -> bool {
        self.commands.contains_key(&cmd_id)
    }

    pub fn has_submenu(&self, menu_id: u64) -> bool {
        self.submenus.contains_key(&menu_id)
    }
}

/// UI domain model: readiness, language, and per-app state.
///
/// Handlers receive this explicitly per dispatch; there is no ambient
/// application-model singleton.
#[derive(Debug)]
pub struct UiModel {
    is_ready: bool,
    language: String,
    supported_languages: Vec<String>,
    global_properties: Option<Value>,
    apps: HashMap<u64, AppModel>,
}

impl Default for UiModel {
    fn default() -> Self {
        Self {
            is_ready: true,
            language: "EN-US".to_string(),
            supported_languages: vec![
                "EN-US".to_string(),
                "ES-MX".to_string(),
                "FR-CA".to_string(),
            ],
            global_properties: None,
            apps: HashMap::new(),
        }
    }
}

impl UiModel {
    pub fn is_ready(&self) -> bool {
        self.is_ready
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.is_ready = ready;
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn app(&self, app_id: u64) -> Option<&AppModel> {
        self.apps.get(&app_id)
    }

    fn app_mut(&mut self, app_id: u64) -> &mut AppModel {
        self.apps.entry(app_id).or_default()
    }

    fn with_app(&mut self, app_id: u64, f: impl FnOnce(&mut AppModel) -> ResultCode) -> ResultCode {
        match self.apps.get_mut(&app_id) {
            Some(app) => f(app),
            None => ResultCode::InvalidId,
        }
    }
}

/// Domain state threaded through the dispatch table.
pub struct UiState {
    pub model: UiModel,
    pub deferred: DeferredReplies,
}

/// The UI component proxy: one dispatch table over one [`UiState`].
pub struct UiProxy {
    state: UiState,
    table: DispatchTable<UiState>,
}

fn param_u64(params: &Value, key: &str) -> Option<u64> {
    params.get(key).and_then(Value::as_u64)
}

fn param_str<'v>(params: &'v Value, key: &str) -> Option<&'v str> {
    params.get(key).and_then(Value::as_str)
}

/// Handlers that mutate per-app state: look the app id up, run the action,
/// echo `{code, method}` back.
fn with_app_reply(
    state: &mut UiState,
    request: &Request,
    ctx: &mut SessionContext<'_>,
    action: impl FnOnce(&mut UiModel, u64) -> ResultCode,
) -> Result<()> {
    let code = match param_u64(&request.params, "appId") {
        Some(app_id) => action(&mut state.model, app_id),
        None => ResultCode::InvalidData,
    };
    ctx.reply_result(request.id, code, &request.method)
}

fn build_table(policy: UnknownMethodPolicy) -> DispatchTable<UiState> {
    DispatchTable::builder()
        .unknown_method(policy)
        .handle("UI.Show", |state: &mut UiState, req, ctx| {
            with_app_reply(state, req, ctx, |model, app_id| {
                model.app_mut(app_id).show = Some(req.params.clone());
                ResultCode::Success
            })
        })
        .handle("UI.Alert", |state: &mut UiState, req, _ctx| {
            // Answered when the user dismisses the alert.
            state.deferred.defer(&req.method, req.id);
            Ok(())
        })
        .handle("UI.SetGlobalProperties", |state: &mut UiState, req, ctx| {
            state.model.global_properties = Some(req.params.clone());
            ctx.reply_result(req.id, ResultCode::Success, &req.method)
        })
        .handle(
            "UI.ResetGlobalProperties",
            |state: &mut UiState, req, ctx| {
                state.model.global_properties = None;
                ctx.reply_result(req.id, ResultCode::Success, &req.method)
            },
        )
        .handle("UI.AddCommand", |state: &mut UiState, req, ctx| {
            with_app_reply(state, req, ctx, |model, app_id| {
                match param_u64(&req.params, "cmdId") {
                    Some(cmd_id) => model.app_mut(app_id).add_command(cmd_id, req.params.clone()),
                    None => ResultCode::InvalidData,
                }
            })
        })
        .handle("UI.DeleteCommand", |state: &mut UiState, req, ctx| {
            with_app_reply(state, req, ctx, |model, app_id| {
                match param_u64(&req.params, "cmdId") {
                    Some(cmd_id) => model.with_app(app_id, |app| app.delete_command(cmd_id)),
                    None => ResultCode::InvalidData,
                }
            })
        })
        .handle("UI.AddSubMenu", |state: &mut UiState, req, ctx| {
            with_app_reply(state, req, ctx, |model, app_id| {
                match param_u64(&req.params, "menuId") {
                    Some(menu_id) => model.app_mut(app_id).add_submenu(menu_id, req.params.clone()),
                    None => ResultCode::InvalidData,
                }
            })
        })
        .handle("UI.DeleteSubMenu", |state: &mut UiState, req, ctx| {
            with_app_reply(state, req, ctx, |model, app_id| {
                match param_u64(&req.params, "menuId") {
                    Some(menu_id) => model.with_app(app_id, |app| app.delete_submenu(menu_id)),
                    None => ResultCode::InvalidData,
                }
            })
        })
        .handle(
            "UI.CreateInteractionChoiceSet",
            |state: &mut UiState, req, ctx| {
                with_app_reply(state, req, ctx, |model, app_id| {
                    match param_u64(&req.params, "interactionChoiceSetID") {
                        Some(set_id) => model
                            .app_mut(app_id)
                            .create_choice_set(set_id, req.params.clone()),
                        None => ResultCode::InvalidData,
                    }
                })
            },
        )
        .handle(
            "UI.DeleteInteractionChoiceSet",
            |state: &mut UiState, req, ctx| {
                with_app_reply(state, req, ctx, |model, app_id| {
                    match param_u64(&req.params, "interactionChoiceSetID") {
                        Some(set_id) => model.with_app(app_id, |app| app.delete_choice_set(set_id)),
                        None => ResultCode::InvalidData,
                    }
                })
            },
        )
        .handle("UI.PerformInteraction", |state: &mut UiState, req, _ctx| {
            // Answered when the user picks a choice (or VR does, via
            // VR.OnChoice).
            state.deferred.defer(&req.method, req.id);
            Ok(())
        })
        .handle("UI.SetMediaClockTimer", |state: &mut UiState, req, ctx| {
            with_app_reply(state, req, ctx, |model, app_id| {
                if req.params.get("updateMode").is_none() {
                    return ResultCode::InvalidData;
                }
                model.app_mut(app_id).media_clock = Some(req.params.clone());
                ResultCode::Success
            })
        })
        .handle("UI.Slider", |state: &mut UiState, req, _ctx| {
            state.deferred.defer(&req.method, req.id);
            Ok(())
        })
        .handle("UI.ChangeRegistration", |state: &mut UiState, req, ctx| {
            let code = match param_str(&req.params, "hmiDisplayLanguage") {
                Some(language) => {
                    state.model.language = language.to_string();
                    ResultCode::Success
                }
                None => ResultCode::InvalidData,
            };
            ctx.reply_result(req.id, code, &req.method)
        })
        .handle("UI.GetCapabilities", |_state: &mut UiState, req, ctx| {
            // Static capabilities, sent unconditionally with no domain call.
            ctx.reply(req.id, capabilities_result())
        })
        .handle("UI.GetLanguage", |state: &mut UiState, req, ctx| {
            ctx.reply(
                req.id,
                json!({
                    "code": ResultCode::Success,
                    "method": req.method,
                    "hmiDisplayLanguage": state.model.language,
                }),
            )
        })
        .handle(
            "UI.GetSupportedLanguages",
            |state: &mut UiState, req, ctx| {
                ctx.reply(
                    req.id,
                    json!({
                        "code": ResultCode::Success,
                        "method": req.method,
                        "languages": state.model.supported_languages,
                    }),
                )
            },
        )
        .handle("UI.IsReady", |state: &mut UiState, req, ctx| {
            ctx.reply(
                req.id,
                json!({
                    "available": state.model.is_ready,
                    "code": ResultCode::Success,
                    "method": req.method,
                }),
            )
        })
        .handle("UI.ScrollableMessage", |state: &mut UiState, req, _ctx| {
            // Answered when the user closes the message.
            state.deferred.defer(&req.method, req.id);
            Ok(())
        })
        .handle("UI.SetAppIcon", |state: &mut UiState, req, _ctx| {
            // Answered once the icon has been fetched.
            state.deferred.defer(&req.method, req.id);
            Ok(())
        })
        .handle("UI.ShowConstantTBT", |_state: &mut UiState, req, ctx| {
            ctx.reply_result(req.id, ResultCode::Success, &req.method)
        })
        .handle("UI.UpdateTurnList", |_state: &mut UiState, req, ctx| {
            ctx.reply_result(req.id, ResultCode::Success, &req.method)
        })
        .handle("UI.AlertManeuver", |_state: &mut UiState, req, ctx| {
            ctx.reply_result(req.id, ResultCode::Success, &req.method)
        })
        .handle("UI.DialNumber", |_state: &mut UiState, req, ctx| {
            ctx.reply_result(req.id, ResultCode::Success, &req.method)
        })
        .handle(
            "UI.PerformAudioPassThru",
            |state: &mut UiState, req, _ctx| {
                // Answered when audio capture finishes.
                state.deferred.defer(&req.method, req.id);
                Ok(())
            },
        )
        .handle("UI.EndAudioPassThru", |state: &mut UiState, req, _ctx| {
            state.deferred.defer(&req.method, req.id);
            Ok(())
        })
        .build()
}

/// Static display/soft-button capabilities advertised by this head unit.
fn capabilities_result() -> Value {
    json!({
        "displayCapabilities": {
            "displayType": "GEN2_8_DMA",
            "textFields": [
                { "fieldName": "mainField1" },
                { "fieldName": "mainField2" },
                { "fieldName": "statusBar" },
                { "fieldName": "mediaClock" },
                { "fieldName": "mediaTrack" },
                { "fieldName": "alertText1" },
                { "fieldName": "alertText2" },
            ],
            "mediaClockFormats": ["CLOCK1", "CLOCK2", "CLOCKTEXT1", "CLOCKTEXT2", "CLOCKTEXT3"],
            "graphicSupported": true,
        },
        "hmiZoneCapabilities": ["FRONT", "BACK"],
        "softButtonCapabilities": [{
            "shortPressAvailable": true,
            "longPressAvailable": true,
            "upDownAvailable": true,
            "imageSupported": true,
        }],
        "code": ResultCode::Success,
        "method": "UI.GetCapabilities",
    })
}

impl UiProxy {
    /// Create a proxy with the default unknown-method policy (ignore).
    pub fn new() -> Self {
        Self::with_policy(UnknownMethodPolicy::Ignore)
    }

    /// Create a proxy with an explicit unknown-method policy.
    pub fn with_policy(policy: UnknownMethodPolicy) -> Self {
        Self {
            state: UiState {
                model: UiModel::default(),
                deferred: DeferredReplies::new(),
            },
            table: build_table(policy),
        }
    }

    /// The UI domain model.
    pub fn model(&self) -> &UiModel {
        &self.state.model
    }

    /// Mutable access for host-driven domain changes.
    pub fn model_mut(&mut self) -> &mut UiModel {
        &mut self.state.model
    }

    /// Number of replies still owed to the core.
    pub fn deferred_count(&self) -> usize {
        self.state.deferred.len()
    }

    fn complete(
        &mut self,
        ctx: &mut SessionContext<'_>,
        method: &str,
        code: ResultCode,
        extra: Option<(&str, Value)>,
    ) -> Result<()> {
        let Some(id) = self.state.deferred.take(method) else {
            return Err(BuslinkError::NoPendingInteraction(method.to_string()));
        };

        let mut result = json!({ "code": code, "method": method });
        if let Some((key, value)) = extra {
            result[key] = value;
        }
        ctx.reply(id, result)
    }

    /// Resolve a pending `UI.Alert` once the user dismisses it.
    pub fn alert_response(&mut self, ctx: &mut SessionContext<'_>, code: ResultCode) -> Result<()> {
        self.complete(ctx, "UI.Alert", code, None)
    }

    /// Resolve a pending `UI.Slider` with the position the user picked.
    pub fn slider_response(
        &mut self,
        ctx: &mut SessionContext<'_>,
        code: ResultCode,
        position: Option<u64>,
    ) -> Result<()> {
        let extra = position.map(|p| ("sliderPosition", json!(p)));
        self.complete(ctx, "UI.Slider", code, extra)
    }

    /// Resolve a pending `UI.PerformInteraction` with the chosen item.
    pub fn interaction_response(
        &mut self,
        ctx: &mut SessionContext<'_>,
        code: ResultCode,
        choice_id: Option<u64>,
    ) -> Result<()> {
        let extra = choice_id.map(|c| ("choiceID", json!(c)));
        self.complete(ctx, "UI.PerformInteraction", code, extra)
    }

    /// Resolve a pending `UI.ScrollableMessage` once the user closes it.
    pub fn scrollable_message_response(
        &mut self,
        ctx: &mut SessionContext<'_>,
        code: ResultCode,
    ) -> Result<()> {
        self.complete(ctx, "UI.ScrollableMessage", code, None)
    }

    /// Resolve a pending `UI.SetAppIcon` once the icon has been fetched.
    pub fn set_app_icon_response(
        &mut self,
        ctx: &mut SessionContext<'_>,
        code: ResultCode,
    ) -> Result<()> {
        self.complete(ctx, "UI.SetAppIcon", code, None)
    }

    /// Resolve a pending `UI.PerformAudioPassThru` once capture finishes.
    pub fn audio_pass_thru_response(
        &mut self,
        ctx: &mut SessionContext<'_>,
        code: ResultCode,
    ) -> Result<()> {
        self.complete(ctx, "UI.PerformAudioPassThru", code, None)
    }

    /// Resolve a pending `UI.EndAudioPassThru`.
    pub fn end_audio_pass_thru_response(
        &mut self,
        ctx: &mut SessionContext<'_>,
        code: ResultCode,
    ) -> Result<()> {
        self.complete(ctx, "UI.EndAudioPassThru", code, None)
    }

    /// Announce that the user triggered a command.
    pub fn notify_command(&self, ctx: &mut SessionContext<'_>, command_id: u64, app_id: u64) {
        ctx.notify(
            "UI.OnCommand",
            json!({ "commandId": command_id, "appId": app_id }),
        );
    }

    /// Announce a system-context change.
    pub fn notify_system_context(&self, ctx: &mut SessionContext<'_>, system_context: &str) {
        ctx.notify(
            "UI.OnSystemContext",
            json!({ "systemContext": system_context }),
        );
    }

    /// Announce that an application was activated.
    pub fn notify_app_activated(&self, ctx: &mut SessionContext<'_>, app_name: &str) {
        ctx.notify("UI.OnAppActivated", json!({ "appName": app_name }));
    }

    /// Announce that a device was chosen.
    pub fn notify_device_chosen(&self, ctx: &mut SessionContext<'_>, device_name: &str) {
        ctx.notify("UI.OnDeviceChosen", json!({ "deviceName": device_name }));
    }

    /// Announce a display-language change.
    pub fn notify_language_change(&self, ctx: &mut SessionContext<'_>, language: &str) {
        ctx.notify(
            "UI.OnLanguageChange",
            json!({ "hmiDisplayLanguage": language }),
        );
    }

    /// Announce a driver-distraction state change.
    pub fn notify_driver_distraction(&self, ctx: &mut SessionContext<'_>, state: &str) {
        ctx.notify(
            "UI.OnDriverDistraction",
            json!({ "state": state, "appId": 0 }),
        );
    }

    /// Announce a turn-by-turn client-state change.
    pub fn notify_tbt_client_state(&self, ctx: &mut SessionContext<'_>, state: &str, app_id: u64) {
        ctx.notify(
            "UI.OnTBTClientState",
            json!({ "state": state, "appId": app_id }),
        );
    }
}

impl Default for UiProxy {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcObserver for UiProxy {
    fn on_registered(&mut self, ctx: &mut SessionContext<'_>) {
        if let Err(e) = ctx.subscribe_to_notification(VR_ON_CHOICE) {
            tracing::warn!(topic = VR_ON_CHOICE, error = %e, "subscribe failed");
        }
    }

    fn on_unregistered(&mut self, ctx: &mut SessionContext<'_>) {
        if let Err(e) = ctx.unsubscribe_from_notification(VR_ON_CHOICE) {
            tracing::debug!(topic = VR_ON_CHOICE, error = %e, "unsubscribe skipped");
        }
    }

    fn on_disconnected(&mut self, _ctx: &mut SessionContext<'_>) {
        // Request ids do not survive the session; replies still owed to it
        // are void and must not leak onto a later session.
        self.state.deferred.clear();
    }

    fn on_request(&mut self, request: &Request, ctx: &mut SessionContext<'_>) {
        match self.table.dispatch(&mut self.state, request, ctx) {
            Ok(Dispatched::Handled) | Ok(Dispatched::Unhandled) => {}
            Err(e) => {
                tracing::warn!(method = %request.method, error = %e, "handler failed");
            }
        }
    }

    fn on_notification(&mut self, notification: &Notification, ctx: &mut SessionContext<'_>) {
        if notification.method != VR_ON_CHOICE || !ctx.is_subscribed(VR_ON_CHOICE) {
            return;
        }

        let choice_id = param_u64(&notification.params, "choiceID");
        match self.interaction_response(ctx, ResultCode::Success, choice_id) {
            Ok(()) => {}
            Err(BuslinkError::NoPendingInteraction(_)) => {
                tracing::debug!("choice notification with no interaction pending");
            }
            Err(e) => {
                tracing::warn!(error = %e, "interaction response failed");
            }
        }
    }
}
