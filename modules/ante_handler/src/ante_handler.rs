//! Aegis transaction-admission module for Caryatid
//! Runs the ante pipeline over submitted transactions and publishes
//! per-transaction admission results

pub mod authz;
pub mod cosmos;
pub mod evm;
pub mod fee_deduct;
pub mod fees;
pub mod in_memory_ledger;
pub mod rewards;
pub mod router;
pub mod sigverify;
pub mod vesting;

mod state;

use aegis_common::{
    messages::{AdmissionResultMessage, ChainMessage, ChainParamsMessage, Message, SubmittedTxsMessage},
    types::BlockInfo,
};

use caryatid_sdk::{module, Context, Subscription};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::state::State;
use anyhow::{anyhow, Result};
use config::Config;
use tracing::{error, info};

const DEFAULT_TXS_SUBSCRIBE_TOPIC: (&str, &str) = ("txs-subscribe-topic", "aegis.txs");
const DEFAULT_PARAMS_SUBSCRIBE_TOPIC: (&str, &str) =
    ("params-subscribe-topic", "aegis.chain.params");
const DEFAULT_ADMISSION_PUBLISH_TOPIC: (&str, &str) =
    ("publish-admission-topic", "aegis.admission.results");

/// Transaction admission module
/// Parameterised by the outer message enum used on the bus
#[module(
    message_type(Message),
    name = "ante-handler",
    description = "Transaction admission (ante) pipeline"
)]
pub struct AnteHandler;

pub struct AnteHandlerConfig {
    pub context: Arc<Context<Message>>,
    pub txs_subscribe_topic: String,
    pub params_subscribe_topic: String,
    pub publish_admission_topic: String,
}

impl AnteHandlerConfig {
    fn conf(config: &Arc<Config>, keydef: (&str, &str)) -> String {
        let actual = config.get_string(keydef.0).unwrap_or(keydef.1.to_string());
        info!("Parameter value '{}' for {}", actual, keydef.0);
        actual
    }

    pub fn new(context: &Arc<Context<Message>>, config: &Arc<Config>) -> Arc<Self> {
        Arc::new(Self {
            context: context.clone(),
            txs_subscribe_topic: Self::conf(config, DEFAULT_TXS_SUBSCRIBE_TOPIC),
            params_subscribe_topic: Self::conf(config, DEFAULT_PARAMS_SUBSCRIBE_TOPIC),
            publish_admission_topic: Self::conf(config, DEFAULT_ADMISSION_PUBLISH_TOPIC),
        })
    }
}

impl AnteHandler {
    async fn read_params(
        params_s: &mut Box<dyn Subscription<Message>>,
    ) -> Result<(BlockInfo, ChainParamsMessage)> {
        match params_s.read().await?.1.as_ref() {
            Message::Chain((blk, ChainMessage::ChainParams(params))) => {
                Ok((blk.clone(), params.clone()))
            }
            msg => Err(anyhow!("Unexpected message {msg:?} for chain params topic")),
        }
    }

    async fn read_transactions(
        txs_s: &mut Box<dyn Subscription<Message>>,
    ) -> Result<(BlockInfo, SubmittedTxsMessage)> {
        match txs_s.read().await?.1.as_ref() {
            Message::Chain((blk, ChainMessage::SubmittedTxs(txs))) => Ok((blk.clone(), txs.clone())),
            msg => Err(anyhow!("Unexpected message {msg:?} for transactions topic")),
        }
    }

    async fn publish_results(
        config: &AnteHandlerConfig,
        block: BlockInfo,
        results: AdmissionResultMessage,
    ) -> Result<()> {
        let packed_message = Arc::new(Message::Chain((block, ChainMessage::Admission(results))));
        let context = config.context.clone();
        let topic = config.publish_admission_topic.clone();

        tokio::spawn(async move {
            context
                .publish(&topic, packed_message)
                .await
                .unwrap_or_else(|e| tracing::error!("Failed to publish: {e}"));
        });

        Ok(())
    }

    async fn run_params(
        state: Arc<Mutex<State>>,
        mut params: Box<dyn Subscription<Message>>,
    ) -> Result<()> {
        loop {
            let (blk, prm) = Self::read_params(&mut params).await?;
            state.lock().await.process_params(&blk, prm);
        }
    }

    async fn run_txs(
        state: Arc<Mutex<State>>,
        mut txs: Box<dyn Subscription<Message>>,
    ) -> Result<()> {
        loop {
            let (blk, submitted) = Self::read_transactions(&mut txs).await?;
            let mut state = state.lock().await;
            let results = state.process_transactions(&blk, &submitted);
            Self::publish_results(&state.config, blk, results).await?;
        }
    }

    /// Main init function
    pub async fn init(&self, context: Arc<Context<Message>>, config: Arc<Config>) -> Result<()> {
        // Get configuration
        let config = AnteHandlerConfig::new(&context, &config);

        // Subscribe to the transaction and parameter topics
        let txs_sub = context.subscribe(&config.txs_subscribe_topic).await?;
        let params_sub = context.subscribe(&config.params_subscribe_topic).await?;

        let state = Arc::new(Mutex::new(State::new(config)));

        let state_params = state.clone();
        context.clone().run(async move {
            AnteHandler::run_params(state_params, params_sub)
                .await
                .unwrap_or_else(|e| error!("Ante handler params reader failed: {e}"));
        });

        context.clone().run(async move {
            AnteHandler::run_txs(state, txs_sub)
                .await
                .unwrap_or_else(|e| error!("Ante handler failed: {e}"));
        });

        Ok(())
    }
}
