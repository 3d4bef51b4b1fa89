pub mod client;
pub mod csv;
pub mod pager;
pub mod rules;

pub use self::csv::{read_rule_rows, write_ledger, CsvRuleTable, RuleSource, LEDGER_HEADER};
pub use client::{
    AccountingApi, AuthError, CredentialProvider, EnvToken, FetchError, FreeAgentClient,
    StaticToken, PAGE_SIZE,
};
pub use pager::{TransactionFetch, TransactionPages};
pub use rules::{
    Classification, ClassificationSource, MappingRule, RuleError, RuleRow, RuleSet,
    DEFAULT_CATEGORY, DEFAULT_DEPARTMENT,
};

pub mod import {
    use crate::*;

    pub fn load_rules<S: RuleSource + ?Sized>(source: &S) -> Result<(RuleSet, Vec<RuleError>), RuleError> {
        let rows = source.load_rows()?;
        Ok(RuleSet::from_rows(&rows))
    }

    pub fn create_client(
        config: &cashline_core::ApiConfig,
    ) -> Result<FreeAgentClient<EnvToken>, FetchError> {
        FreeAgentClient::new(config, EnvToken::new(config.token_env.clone()))
    }
}
