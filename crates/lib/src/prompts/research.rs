pub const COMPETITOR_SYSTEM_PROMPT: &str = "You are an on-demand competitive intelligence analyst. Use web search to surface recent competitor moves, marketing campaigns, and market signals. Always respond with STRICT JSON that matches the provided schema. Do not include commentary, preambles, or code fences.";

pub const WEB_SEARCH_TOOL_DESCRIPTION: &str = "Search the live web for up-to-date competitor information, recent campaigns, pricing changes, and market activity.";

/// Builds the research request, including the JSON schema the model must follow.
pub fn competitor_user_prompt(query: &str) -> String {
    [
        "Research the following competitor landscape using web search:",
        &format!("Query: \"{query}\""),
        "",
        "Return STRICT JSON that matches this schema:",
        "{",
        "  \"query\": string; // echo the user query",
        "  \"searchInsights\": Array<{",
        "     \"title\": string;",
        "     \"snippet\": string;",
        "     \"url\": string;",
        "     \"source\"?: string;",
        "     \"publishedAt\"?: string;",
        "  }>; // at least 3 distinct URLs from the past 12 months",
        "  \"googleTrends\": {",
        "     \"success\": boolean;",
        "     \"request\": { \"query\": string; \"geo\": string; \"dateRange\": string; \"widgets\": string; };",
        "     \"interestOverTime\": Array<{ \"label\": string; \"value\": number; }>; // normalized 0-100 scale",
        "     \"topRegions\": Array<{ \"region\": string; \"value\": number; }>;",
        "     \"rawExcerpt\"?: string;",
        "     \"error\"?: string;",
        "  };",
        "  \"searchRaw\"?: unknown; // optional debug metadata or retrieved snippets",
        "}",
        "",
        "If web search yields limited data, keep the schema but populate empty arrays and set success=false. Do not fabricate URLs.",
        "Only return this JSON object.",
    ]
    .join("\n")
}
