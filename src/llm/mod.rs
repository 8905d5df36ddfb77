//! LLM Provider Clients and Abstractions
//!
//! The rest of the application talks to chat models only through the
//! [`LLMClient`] trait. The factory pattern follows the configuration:
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`Provider`] - A resolved provider (endpoint, key, model, parameters)
//! - [`LLMClientFactoryTrait`] - Creates clients by [`ProviderKind`]
//! - [`ConfigBasedLLMFactory`] - Creates clients based on `grasp.toml`
//!
//! # Example
//!
//! ```ignore
//! use grasp::llm::{ConfigBasedLLMFactory, LLMClientFactoryTrait, ProviderKind};
//!
//! let factory = ConfigBasedLLMFactory::new(config_manager);
//! let client = factory.create_for(ProviderKind::Anthropic)?;
//! let answer = client.generate_with_system("Be brief.", "What is 2+2?").await?;
//! ```

/// Core LLM client trait, provider selection and the client factory.
pub mod client;

pub mod anthropic;
pub mod gemini;
pub mod openai;

pub use client::{
    ConfigBasedLLMFactory, LLMClient, LLMClientFactoryTrait, ModelParams, Provider, ProviderKind,
};
