//! Main application state and update loop

use std::sync::{Arc, Mutex};
use std::time::Duration;

use eframe::egui;
use tokio::runtime::Runtime;
use web_time::Instant;

use builder_codes_adapters::AppConfig;
use builder_codes_core::{
    AttributionMode, CallBatchStatus, CallVariant, CallsId, Connection, ConnectionStatus,
    ConnectorInfo, FlowEdit, InspectorOutcome, InspectorState, SendCallsFlow, SendCallsForm,
    SubmissionStatus, SupportedChain,
};

use crate::bridge::WalletBridge;
use crate::state::{put, submission_status_label, take, ConnectionPanelState, PollTimer};
use crate::ui;

type Slot<T> = Arc<Mutex<Option<T>>>;

fn slot<T>() -> Slot<T> {
    Arc::new(Mutex::new(None))
}

/// The main application state
pub struct App {
    bridge: WalletBridge,
    /// Blocking wallet and RPC calls run on this runtime's blocking pool
    runtime: Runtime,
    connectors: Vec<ConnectorInfo>,
    conn: ConnectionPanelState,
    flow: SendCallsFlow,
    inspector: InspectorState,
    poll: PollTimer,
    connect_result: Slot<Result<Connection, String>>,
    disconnect_result: Slot<Result<Connection, String>>,
    block_result: Slot<Result<u64, String>>,
    submit_result: Slot<Result<CallsId, String>>,
    status_result: Slot<(CallsId, Result<CallBatchStatus, String>)>,
}

impl App {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: &AppConfig,
        bridge: WalletBridge,
        runtime: Runtime,
    ) -> Self {
        let form = SendCallsForm {
            chain: config.default_chain,
            ..SendCallsForm::default()
        };
        let mut app = Self {
            connectors: bridge.connectors(),
            bridge,
            runtime,
            conn: ConnectionPanelState::default(),
            flow: SendCallsFlow::new(form),
            inspector: InspectorState::default(),
            poll: PollTimer::new(Duration::from_millis(config.status_poll_interval_ms)),
            connect_result: slot(),
            disconnect_result: slot(),
            block_result: slot(),
            submit_result: slot(),
            status_result: slot(),
        };
        app.start_restore(&cc.egui_ctx);
        app
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(egui::Visuals::dark());

        self.check_connect_result(ctx);
        self.check_disconnect_result();
        self.check_block_result();
        self.check_submit_result();
        self.check_status_result();
        self.drive_polling(ctx);

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui::styled_heading(ui, "Builder Codes");
                ui.add_space(20.0);
                ui.separator();
                ui.label("Wallet connection, EIP-5792 call batches and ERC-8021 attribution");
            });
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            let git_hash = env!("GIT_HASH");
            ui.label(
                egui::RichText::new(format!(
                    "v{} · {} · built {}",
                    env!("CARGO_PKG_VERSION"),
                    &git_hash[..git_hash.len().min(8)],
                    env!("BUILD_TIME"),
                ))
                .small()
                .weak(),
            );
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_space(10.0);
                self.render_connection(ui, ctx);
                ui.add_space(10.0);
                self.render_connect(ui, ctx);
                ui.add_space(10.0);
                self.render_send_calls(ui, ctx);
                ui.add_space(10.0);
                self.render_inspector(ui);
                ui.add_space(20.0);
            });
        });
    }
}

impl App {
    fn render_connection(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui::section_header(ui, "Connection");
        ui::card(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Status:").strong());
                ui::connection_status(ui, self.conn.connection.status);
            });

            let addresses = if self.conn.connection.addresses.is_empty() {
                "none".to_owned()
            } else {
                self.conn
                    .connection
                    .addresses
                    .iter()
                    .map(|a| a.to_checksum(None))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            ui::labeled_value(ui, "Addresses", &addresses);

            let chain = match self.conn.connection.chain_id {
                Some(id) => match SupportedChain::from_chain_id(id) {
                    Some(chain) => format!("{id} ({chain})"),
                    None => id.to_string(),
                },
                None => "none".to_owned(),
            };
            ui::labeled_value(ui, "Chain ID", &chain);

            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Latest block:").strong());
                if self.conn.block_loading {
                    ui.spinner();
                } else if let Some(block) = self.conn.latest_block {
                    ui.label(egui::RichText::new(block.to_string()).monospace());
                } else {
                    ui.label("–");
                }
                if self.conn.connection.is_connected()
                    && !self.conn.block_loading
                    && ui.small_button("⟳").on_hover_text("Refresh").clicked()
                {
                    self.start_block_fetch(ctx);
                }
            });
            if let Some(err) = &self.conn.block_error {
                ui::error_message(ui, err);
            }

            ui.add_space(6.0);
            let can_disconnect = self.conn.connection.status == ConnectionStatus::Connected
                && !self.conn.is_busy();
            if ui
                .add_enabled(can_disconnect, egui::Button::new("Disconnect"))
                .clicked()
            {
                self.start_disconnect(ctx);
            }
        });
    }

    fn render_connect(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui::section_header(ui, "Connect");
        ui::card(ui, |ui| {
            if self.connectors.is_empty() {
                ui.label("No wallet connectors available.");
            }
            let enabled = !self.conn.connection.is_connected() && !self.conn.is_busy();
            let mut clicked = None;
            ui.horizontal_wrapped(|ui| {
                for connector in &self.connectors {
                    if ui
                        .add_enabled(enabled, egui::Button::new(&connector.name))
                        .clicked()
                    {
                        clicked = Some(connector.uid.clone());
                    }
                }
            });
            if let Some(uid) = clicked {
                self.start_connect(uid, ctx);
            }

            ui::labeled_value(ui, "Status", self.conn.attempt.label());
            if let Some(uid) = &self.conn.connecting {
                ui::loading(ui, &format!("Connecting to {uid}…"));
            } else if self.conn.restoring {
                ui::loading(ui, "Restoring previous session…");
            }
            if let Some(err) = &self.conn.error {
                ui::error_message(ui, err);
            }
        });
    }

    fn render_send_calls(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui::section_header(ui, "Send Calls");
        let form = self.flow.form().clone();
        let mut edits = Vec::new();

        ui::card(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label("Chain:");
                let mut chain = form.chain;
                egui::ComboBox::from_id_salt("chain_select")
                    .selected_text(chain.name())
                    .show_ui(ui, |ui| {
                        for c in SupportedChain::ALL {
                            ui.selectable_value(&mut chain, c, c.name());
                        }
                    });
                if chain != form.chain {
                    edits.push(FlowEdit::Chain(chain));
                }
            });

            ui.horizontal(|ui| {
                ui.label("Attribution:");
                let mut mode = form.mode;
                egui::ComboBox::from_id_salt("attribution_select")
                    .selected_text(mode.label())
                    .width(260.0)
                    .show_ui(ui, |ui| {
                        for m in AttributionMode::ALL {
                            ui.selectable_value(&mut mode, m, m.label());
                        }
                    });
                if mode != form.mode {
                    edits.push(FlowEdit::Mode(mode));
                }
            });

            match form.mode {
                AttributionMode::None => {}
                AttributionMode::Canonical | AttributionMode::Custom => {
                    ui.horizontal(|ui| {
                        ui.label("Builder code:");
                        let mut code = form.builder_code.clone();
                        if ui::text_input(ui, &mut code, "abc123").changed() {
                            edits.push(FlowEdit::BuilderCode(code));
                        }
                    });
                    if form.mode == AttributionMode::Custom {
                        ui.horizontal(|ui| {
                            ui.label("Registry address:");
                            let mut registry = form.registry_address.clone();
                            if ui::text_input(ui, &mut registry, "0x...").changed() {
                                edits.push(FlowEdit::RegistryAddress(registry));
                            }
                        });
                    }
                }
                AttributionMode::Malformed => {
                    ui.horizontal(|ui| {
                        ui.label("Raw suffix:");
                        let mut raw = form.raw_suffix.clone();
                        if ui::text_input(ui, &mut raw, "sent to the wallet verbatim").changed() {
                            edits.push(FlowEdit::RawSuffix(raw));
                        }
                    });
                }
            }
            if form.mode != AttributionMode::None {
                match form.attribution_choice().resolve() {
                    Ok(Some(suffix)) => {
                        ui::labeled_field_with_copy(ui, "dataSuffix", &suffix.to_wire())
                    }
                    Ok(None) => {}
                    Err(e) => ui::error_message(ui, &e.to_string()),
                }
            }

            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.label("Call:");
                let mut variant = form.variant;
                ui.radio_value(&mut variant, CallVariant::NoOp, CallVariant::NoOp.label());
                ui.radio_value(
                    &mut variant,
                    CallVariant::TokenTransfer,
                    CallVariant::TokenTransfer.label(),
                );
                if variant != form.variant {
                    edits.push(FlowEdit::Variant(variant));
                }
            });
            if form.variant == CallVariant::TokenTransfer {
                ui.horizontal(|ui| {
                    ui.label("Recipient:");
                    let mut recipient = form.recipient.clone();
                    if ui::text_input(ui, &mut recipient, "0x...").changed() {
                        edits.push(FlowEdit::Recipient(recipient));
                    }
                });
                ui.horizontal(|ui| {
                    ui.label(format!("Amount ({}):", form.chain.token_symbol()));
                    let mut amount = form.amount.clone();
                    if ui::text_input(ui, &mut amount, "0.01").changed() {
                        edits.push(FlowEdit::Amount(amount));
                    }
                });
            }

            ui.add_space(8.0);
            let can_send =
                self.conn.connection.is_connected() && !self.flow.status().is_in_flight();
            ui.horizontal(|ui| {
                if ui::primary_button_enabled(ui, "Send Calls", can_send).clicked() {
                    self.start_submit(ctx);
                }
                if self.flow.status().is_terminal() && ui.button("Reset").clicked() {
                    self.flow.reset();
                    self.poll.reset();
                }
            });
            if !self.conn.connection.is_connected() {
                ui.label(egui::RichText::new("Connect a wallet to send calls.").weak());
            }

            self.render_submission_status(ui);
        });

        for edit in edits {
            self.flow.edit(edit);
        }
    }

    fn render_submission_status(&self, ui: &mut egui::Ui) {
        let status = self.flow.status();
        if status == SubmissionStatus::Idle {
            return;
        }
        ui.add_space(6.0);
        match status {
            SubmissionStatus::Submitting | SubmissionStatus::Pending => {
                ui::loading(ui, submission_status_label(status));
            }
            SubmissionStatus::Included => ui::success_message(ui, submission_status_label(status)),
            _ => ui::labeled_value(ui, "Status", submission_status_label(status)),
        }
        if let Some(id) = self.flow.calls_id() {
            ui::labeled_field_with_copy(ui, "Calls ID", &id.0);
        }
        if let Some(hash) = self.flow.transaction_hash() {
            ui::labeled_field_with_copy(ui, "Transaction", &hash.to_string());
        }
        if let Some(link) = self.flow.explorer_link() {
            if ui.link("View on block explorer").clicked() {
                ui::open_url(&link);
            }
        }
        if let Some(err) = self.flow.last_error() {
            ui::error_message(ui, err);
        }
    }

    fn render_inspector(&mut self, ui: &mut egui::Ui) {
        ui::section_header(ui, "Suffix Inspector");
        ui::card(ui, |ui| {
            ui.label("Paste calldata or a dataSuffix to look for an ERC-8021 attribution.");
            let mut input = self.inspector.input().to_owned();
            if ui::multiline_input(ui, &mut input, "0x...", 3).changed() {
                self.inspector.set_input(input);
            }
            if ui.button("Parse").clicked() {
                self.inspector.parse();
            }
            let outcome = self.inspector.outcome();
            match outcome {
                InspectorOutcome::NotAttempted => {}
                InspectorOutcome::Absent => {
                    ui.label("No valid ERC-8021 attribution found.");
                }
                InspectorOutcome::Present(_) => {
                    for (label, value) in outcome.rows() {
                        ui::labeled_field_with_copy(ui, label, &value);
                    }
                }
            }
        });
    }
}

// Background work
impl App {
    fn start_restore(&mut self, ctx: &egui::Context) {
        self.conn.restoring = true;
        let bridge = self.bridge.clone();
        let result = Arc::clone(&self.connect_result);
        let ctx = ctx.clone();
        self.runtime.spawn_blocking(move || {
            put(&result, bridge.reconnect());
            ctx.request_repaint();
        });
    }

    fn start_connect(&mut self, uid: String, ctx: &egui::Context) {
        tracing::info!(connector = %uid, "connect requested");
        self.conn.begin_connect(uid.clone());
        let bridge = self.bridge.clone();
        let result = Arc::clone(&self.connect_result);
        let ctx = ctx.clone();
        self.runtime.spawn_blocking(move || {
            put(&result, bridge.connect(&uid));
            ctx.request_repaint();
        });
    }

    fn check_connect_result(&mut self, ctx: &egui::Context) {
        let Some(result) = take(&self.connect_result) else {
            return;
        };
        self.conn.finish_connect(result.is_ok());
        match result {
            Ok(connection) => {
                self.conn.connection = connection;
                if self.conn.connection.is_connected() {
                    self.start_block_fetch(ctx);
                }
            }
            Err(e) => {
                self.conn.error = Some(e);
                self.conn.connection = self.bridge.connection();
            }
        }
    }

    fn start_disconnect(&mut self, ctx: &egui::Context) {
        self.conn.disconnecting = true;
        let bridge = self.bridge.clone();
        let result = Arc::clone(&self.disconnect_result);
        let ctx = ctx.clone();
        self.runtime.spawn_blocking(move || {
            put(&result, bridge.disconnect());
            ctx.request_repaint();
        });
    }

    fn check_disconnect_result(&mut self) {
        let Some(result) = take(&self.disconnect_result) else {
            return;
        };
        self.conn.disconnecting = false;
        match result {
            Ok(connection) => {
                self.conn.connection = connection;
                self.conn.error = None;
                self.conn.latest_block = None;
                self.conn.block_error = None;
            }
            Err(e) => {
                self.conn.error = Some(e);
                self.conn.connection = self.bridge.connection();
            }
        }
    }

    fn start_block_fetch(&mut self, ctx: &egui::Context) {
        let Some(chain) = self
            .conn
            .connection
            .chain_id
            .and_then(SupportedChain::from_chain_id)
        else {
            self.conn.latest_block = None;
            self.conn.block_error = Some("wallet is on an unsupported chain".to_owned());
            return;
        };
        self.conn.block_loading = true;
        self.conn.block_error = None;
        let bridge = self.bridge.clone();
        let result = Arc::clone(&self.block_result);
        let ctx = ctx.clone();
        self.runtime.spawn_blocking(move || {
            put(&result, bridge.block_number(chain));
            ctx.request_repaint();
        });
    }

    fn check_block_result(&mut self) {
        let Some(result) = take(&self.block_result) else {
            return;
        };
        self.conn.block_loading = false;
        match result {
            Ok(block) => self.conn.latest_block = Some(block),
            Err(e) => {
                tracing::warn!(error = %e, "block number fetch failed");
                self.conn.latest_block = None;
                self.conn.block_error = Some(e);
            }
        }
    }

    fn start_submit(&mut self, ctx: &egui::Context) {
        let from = self.conn.connection.primary_address();
        let request = match self.flow.begin_submit(from) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "call batch not submitted");
                return;
            }
        };
        tracing::info!(
            chain_id = request.chain_id,
            data_suffix = ?request.data_suffix.as_ref().map(|s| s.to_wire()),
            "submitting call batch"
        );
        self.poll.reset();
        let bridge = self.bridge.clone();
        let result = Arc::clone(&self.submit_result);
        let ctx = ctx.clone();
        self.runtime.spawn_blocking(move || {
            put(&result, bridge.send_calls(&request));
            ctx.request_repaint();
        });
    }

    fn check_submit_result(&mut self) {
        let Some(result) = take(&self.submit_result) else {
            return;
        };
        if let Err(e) = &result {
            tracing::warn!(error = %e, "wallet_sendCalls failed");
        }
        self.flow.on_submitted(result);
        // The wallet may have switched chains for this batch.
        let previous = self.conn.connection.chain_id;
        self.conn.connection = self.bridge.connection();
        if self.conn.connection.chain_id != previous {
            self.conn.latest_block = None;
        }
    }

    fn drive_polling(&mut self, ctx: &egui::Context) {
        if !self.flow.should_poll() {
            return;
        }
        let now = Instant::now();
        if self.poll.due(now) {
            if let Some(id) = self.flow.calls_id().cloned() {
                self.poll.started(now);
                let bridge = self.bridge.clone();
                let result = Arc::clone(&self.status_result);
                let ctx = ctx.clone();
                self.runtime.spawn_blocking(move || {
                    let status = bridge.calls_status(&id);
                    put(&result, (id, status));
                    ctx.request_repaint();
                });
            }
        }
        ctx.request_repaint_after(self.poll.interval());
    }

    fn check_status_result(&mut self) {
        let Some((id, result)) = take(&self.status_result) else {
            return;
        };
        self.poll.finished();
        if let Err(e) = &result {
            tracing::warn!(calls_id = %id, error = %e, "wallet_getCallsStatus failed");
        }
        self.flow.on_status(&id, result);
        if let Some(hash) = self.flow.transaction_hash() {
            if self.flow.status() == SubmissionStatus::Included {
                tracing::info!(calls_id = %id, tx = %hash, "call batch included");
            }
        }
    }
}
