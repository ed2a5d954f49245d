//! Prompt templates and retrieval queries.

use vendorrisk_shared::{Criticality, Finding, RetrievedChunk};

pub(crate) fn classify(user_message: &str) -> String {
    format!(
        r#"Your job is to classify the user's request into one of:
- "risk": if the user is asking about risk analysis of a company.
- "other": for greetings, unrelated messages, or general help.

Here are examples:
1. "I want to analyze Apple inc" → risk
2. "analysis tesla?" → risk
3. "what is contract" → other
4. "what can u do?" → other
5. "Hi, how are you?" → other

Now classify this message:
"{user_message}"

Respond with only one word from [risk, other]."#
    )
}

pub(crate) fn chatbot(user_message: &str) -> String {
    format!(
        "You are a Contract Risk Analyzer Chatbot that answers questions related to contracts, \
risk analysis, and your capabilities.
This tool helps companies understand risks when contracting with other companies.
Give a reply in 2-3 sentences, keep it professional.

Answer this question: {user_message}"
    )
}

pub(crate) fn extraction(user_message: &str) -> String {
    format!(
        r#"Extract company name and criticality from this statement:
{user_message}

- Company name: any real company name.
- Criticality: one of [high, medium, low].

Example inputs:
1. "Analyze Apple with high criticality"
2. "Risk assessment for Tesla, criticality is low"

Output strictly in JSON format:
{{
    "companyName": "Tesla",
    "criticality": "high"
}}

If you cannot extract both values, use null for missing fields."#
    )
}

/// Text block embedded for one verified finding.
pub(crate) fn document_text(company: &str, finding: &Finding) -> String {
    format!(
        "Company: {company}\nTitle: {}\nSnippet: {}\nURL: {}\nTrust Score: {}",
        finding.title,
        finding.snippet,
        finding.url,
        finding.trust_score.unwrap_or(0.0)
    )
}

pub(crate) fn risk_query(company: &str) -> String {
    format!("{company} financial regulatory security risks lawsuits incidents")
}

pub(crate) fn resilience_query(company: &str) -> String {
    format!("{company} compliance certifications partnerships sustainability security awards")
}

/// Numbered evidence list cited by the analysis prompt.
pub(crate) fn evidence(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "[Source {}] {}\nURL: {}\n\n",
                i + 1,
                chunk.doc,
                chunk.metadata.url
            )
        })
        .collect()
}

pub(crate) fn analysis(
    company: &str,
    criticality: Criticality,
    confidence: f64,
    evidence: &str,
) -> String {
    let confidence_pct = confidence * 100.0;
    format!(
        r#"You are a senior vendor risk analyst helping our company decide whether to
enter into a **business contract** with "{company}".

Criticality of this relationship: {criticality}

Evaluate the company based on the evidence below, focusing on how their
financial stability, security posture, legal history, and reputation
affect **our business risk** as a contracting partner.

The evidence comes from multiple online sources.
Confidence level of data: {confidence_pct:.0}%.

Your output must include:
1. financial_risk (1-5)
2. security_risk (1-5)
3. reputation_risk (1-5)
4. resilience_strength (1-5): how effectively the company mitigates or recovers from issues
5. overall_recommendation: choose one of
   - "safe_to_contract"
   - "contract_with_protections"
   - "do_not_contract"
   - "insufficient_data"
6. rationale_with_citations: bullet points explaining your reasoning,
   referencing the sources provided.

Decision logic:
- "safe_to_contract" → average risk ≤ 2.5 AND resilience ≥ 4
- "contract_with_protections" → average risk 2.6-3.8 OR resilience between 3-4
- "do_not_contract" → average risk ≥ 3.9 OR resilience ≤ 2
- If confidence is below 60%, you must return "overall_recommendation": "insufficient_data"
  and explain why.

Use a business-centric lens: focus on what this means for forming a
contract, e.g. payment reliability, regulatory exposure, data safety,
and brand reputation impacts.

Return valid JSON with these keys:
financial_risk, security_risk, reputation_risk, resilience_strength,
overall_recommendation, rationale_with_citations.

Evidence:
{evidence}"#
    )
}
