//! Query routing by intent
//!
//! Keyword-based classification deciding which backend a query belongs
//! to: structured SQL data, document retrieval, or one of the analysis
//! pipelines. Sits in front of the extractor so hosts can dispatch
//! before paying for full parameter extraction.

use std::collections::HashSet;

/// Backend a query should be dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryIntent {
    /// Structured market data: prices, rankings, metrics
    SqlQuery,
    /// Document retrieval: announcements, reports, research
    RagQuery,
    /// Financial statement analysis
    FinancialAnalysis,
    /// Fund flow queries
    MoneyFlow,
    /// Concept and sector constituent queries
    ConceptStock,
    /// Anything else
    General,
}

impl QueryIntent {
    /// Name of the handler that serves this intent
    pub fn handler_name(&self) -> &'static str {
        match self {
            Self::SqlQuery => "sql-query",
            Self::RagQuery => "rag-query",
            Self::FinancialAnalysis => "financial-analysis",
            Self::MoneyFlow => "money-flow",
            Self::ConceptStock => "concept-stock",
            Self::General => "general",
        }
    }
}

/// Keywords for intent classification
mod keywords_zh {
    pub const SQL: &[&str] = &[
        "股价", "价格", "行情", "K线", "走势", "市值", "成交量", "成交额",
        "涨幅", "跌幅", "涨跌幅", "换手率", "排名", "排行", "市盈率", "市净率",
        "PE", "PB",
    ];

    pub const RAG: &[&str] = &[
        "公告", "年报披露", "研报", "新闻", "消息", "舆情", "披露", "公示",
    ];

    pub const FINANCIAL: &[&str] = &[
        "财务", "利润", "营收", "营业收入", "净利润", "ROE", "杜邦", "现金流",
        "健康度", "业绩", "年报", "季报", "中报",
    ];

    pub const MONEY_FLOW: &[&str] = &[
        "主力资金", "资金流向", "净流入", "净流出", "主力", "大单", "超大单",
        "北向资金",
    ];

    pub const CONCEPT: &[&str] = &["概念", "概念股", "板块成分", "成分股", "题材"];
}

/// Keyword router over the intent taxonomy
#[derive(Debug, Clone, Default)]
pub struct QueryRouter;

impl QueryRouter {
    pub fn new() -> Self {
        Self
    }

    /// Classify the intent of a query
    pub fn classify(&self, query: &str) -> QueryIntent {
        let intents = Self::detect_all_intents(query);
        tracing::debug!(?intents, "detected intents");

        // Priority order: the specialized backends win over plain SQL
        for intent in [
            QueryIntent::MoneyFlow,
            QueryIntent::ConceptStock,
            QueryIntent::RagQuery,
            QueryIntent::FinancialAnalysis,
            QueryIntent::SqlQuery,
        ] {
            if intents.contains(&intent) {
                return intent;
            }
        }
        QueryIntent::General
    }

    fn detect_all_intents(query: &str) -> HashSet<QueryIntent> {
        let mut intents = HashSet::new();

        if Self::matches_any(query, keywords_zh::SQL) {
            intents.insert(QueryIntent::SqlQuery);
        }
        if Self::matches_any(query, keywords_zh::RAG) {
            intents.insert(QueryIntent::RagQuery);
        }
        if Self::matches_any(query, keywords_zh::FINANCIAL) {
            intents.insert(QueryIntent::FinancialAnalysis);
        }
        if Self::matches_any(query, keywords_zh::MONEY_FLOW) {
            intents.insert(QueryIntent::MoneyFlow);
        }
        if Self::matches_any(query, keywords_zh::CONCEPT) {
            intents.insert(QueryIntent::ConceptStock);
        }

        intents
    }

    fn matches_any(query: &str, keywords: &[&str]) -> bool {
        keywords.iter().any(|kw| query.contains(kw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_intent() {
        let router = QueryRouter::new();
        assert_eq!(router.classify("贵州茅台的股价"), QueryIntent::SqlQuery);
        assert_eq!(router.classify("涨幅排名前10"), QueryIntent::SqlQuery);
    }

    #[test]
    fn test_rag_intent() {
        let router = QueryRouter::new();
        assert_eq!(router.classify("贵州茅台最近的公告"), QueryIntent::RagQuery);
    }

    #[test]
    fn test_financial_intent() {
        let router = QueryRouter::new();
        assert_eq!(
            router.classify("贵州茅台2024年报的利润"),
            QueryIntent::FinancialAnalysis
        );
    }

    #[test]
    fn test_money_flow_wins_over_sql() {
        let router = QueryRouter::new();
        assert_eq!(
            router.classify("主力资金净流入排名"),
            QueryIntent::MoneyFlow
        );
    }

    #[test]
    fn test_concept_intent() {
        let router = QueryRouter::new();
        assert_eq!(
            router.classify("新能源概念股有哪些"),
            QueryIntent::ConceptStock
        );
    }

    #[test]
    fn test_general_fallback() {
        let router = QueryRouter::new();
        assert_eq!(router.classify("讲一个笑话"), QueryIntent::General);
        assert_eq!(QueryIntent::General.handler_name(), "general");
    }
}
