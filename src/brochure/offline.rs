//! Offline brochure templates filled from fixture content.
//!
//! These back the offline model so the whole pipeline can run without an
//! API key. Statistics and names are scraped out of the fixture text with
//! regular expressions and keyword checks.

use std::sync::LazyLock;

use regex::Regex;
use tracing::error;

use super::Tone;
use crate::compiler::ConsolidatedContent;
use crate::validate::validate_compiled_content;

const FORMAL_FIXTURE: &str = include_str!("../../fixtures/offline_formal.json");
const HUMOROUS_FIXTURE: &str = include_str!("../../fixtures/offline_humorous.json");

static RE_MODELS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Browse ([\d\w\+]+) models").unwrap());
static RE_DATASETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Browse ([\d\w\+]+) datasets").unwrap());
static RE_ORGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"More than ([\d\w\,]+) organizations").unwrap());
static RE_MISSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"mission is to (.*?)\.").unwrap());
static RE_SOURCE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^--- (\S+) ---$").unwrap());

const LEGAL_NOTE: &str = "### Legal Note\nContent generated offline for testing.\n";

/// Compiled content shipped with the crate for `tone`
pub fn fixture_content(tone: Tone) -> ConsolidatedContent {
    let raw = match tone {
        Tone::Formal => FORMAL_FIXTURE,
        Tone::Humorous => HUMOROUS_FIXTURE,
    };
    match serde_json::from_str(raw) {
        Ok(value) => validate_compiled_content(&value),
        Err(e) => {
            error!("Error loading offline fixture for {} tone: {}", tone, e);
            ConsolidatedContent::new()
        }
    }
}

/// Render the offline brochure for `tone`
pub fn render(tone: Tone, company: &str, content: &ConsolidatedContent) -> String {
    match tone {
        Tone::Formal => formal_brochure(company, content),
        Tone::Humorous => humorous_brochure(company, content),
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

fn category<'a>(content: &'a ConsolidatedContent, name: &str) -> &'a str {
    content.get(name).map(String::as_str).unwrap_or("")
}

/// First `--- <url> ---` header of a consolidated blob
pub fn source_url(text: &str) -> Option<String> {
    capture(&RE_SOURCE_HEADER, text)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub models: String,
    pub datasets: String,
    pub orgs: String,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            models: "1M+".to_string(),
            datasets: "250k+".to_string(),
            orgs: "50,000".to_string(),
        }
    }
}

/// Facts the formal template is filled with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormalFacts {
    pub mission: String,
    pub description: String,
    pub stats: Stats,
    pub clients: Vec<String>,
    pub culture: Vec<String>,
    pub areas: Vec<String>,
    pub benefits: Vec<String>,
    pub website: Option<String>,
}

pub fn formal_facts(content: &ConsolidatedContent) -> FormalFacts {
    let mut facts = FormalFacts::default();

    let about = category(content, "about page");
    if let Some(line) = about.split('\n').nth(3) {
        facts.description = line.to_string();
    }
    if let Some(models) = capture(&RE_MODELS, about) {
        facts.stats.models = models;
    }
    if let Some(datasets) = capture(&RE_DATASETS, about) {
        facts.stats.datasets = datasets;
    }
    if let Some(orgs) = capture(&RE_ORGS, about) {
        facts.stats.orgs = orgs;
    }
    facts.website = source_url(about);

    let customers = category(content, "customers page");
    for client in ["Google", "Amazon", "Microsoft", "IBM", "NVIDIA"] {
        if customers.contains(client) || about.contains(client) {
            facts.clients.push(client.to_string());
        }
    }

    let careers = category(content, "careers page");
    if let Some(mission) = capture(&RE_MISSION, careers) {
        facts.mission = format!("to {}", mission);
    }
    for area in ["Engineering", "Research", "Sales", "Customer Success", "Science"] {
        if careers.contains(area) {
            facts.areas.push(area.to_string());
        }
    }
    for benefit in ["Flexible Work", "Health Insurance", "Equity", "Parental Leave"] {
        if careers.contains(benefit) {
            facts.benefits.push(benefit.to_string());
        }
    }
    if careers.contains("diversity") {
        facts.culture.push("Diversity & Inclusion".to_string());
    }
    if careers.contains("development") {
        facts.culture.push("Professional Development".to_string());
    }
    if careers.contains("well-being") {
        facts.culture.push("Well-being".to_string());
    }
    if careers.contains("collaboration") || careers.contains("community") {
        facts.culture.push("Collaboration".to_string());
    }

    facts
}

pub fn formal_brochure(company: &str, content: &ConsolidatedContent) -> String {
    let facts = formal_facts(content);
    let mut text = format!(
        "# {company}\n\n\
         ### Summary\n\
         At **{company}**, our mission is: \"{mission}\".\n\
         {description}\n\n\
         ### Value Proposition\n\
         We are the leading platform where the machine learning community collaborates on models, datasets, and applications.\n\n\
         ### Products/Services\n\
         - **AI Models**: Access to over {models} models.\n\
         - **Datasets**: A collection of over {datasets} datasets.\n\
         - **AI Applications**: Tools to build demos and applications.\n\
         - **Enterprise Solutions**: Enterprise-grade security and dedicated support.\n\n\
         ### Customers\n\
         We serve a wide variety of industries. More than **{orgs} organizations** use our platform, including prominent names like:\n",
        company = company,
        mission = facts.mission,
        description = facts.description,
        models = facts.stats.models,
        datasets = facts.stats.datasets,
        orgs = facts.stats.orgs,
    );

    for client in &facts.clients {
        text.push_str(&format!("- **{}**\n", client));
    }

    text.push_str("\n### Culture\n");
    for value in &facts.culture {
        text.push_str(&format!("- **{}**\n", value));
    }

    text.push_str("\n### Careers\nWe are constantly seeking diverse talent. We offer opportunities in areas such as:\n");
    for area in &facts.areas {
        text.push_str(&format!("- {}\n", area));
    }

    text.push_str("\n**Benefits**:\n");
    for benefit in &facts.benefits {
        text.push_str(&format!("- {}\n", benefit));
    }

    text.push_str("\n### Contact\n");
    match &facts.website {
        Some(url) => text.push_str(&format!(
            "For more information, visit our [website]({}).\n",
            url
        )),
        None => text.push_str("For more information, visit our website.\n"),
    }

    text.push('\n');
    text.push_str(LEGAL_NOTE);
    text
}

/// Facts the humorous template is filled with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HumorousFacts {
    pub stats: Stats,
    pub companies: Vec<String>,
    pub benefits: Vec<String>,
}

pub fn humorous_facts(content: &ConsolidatedContent) -> HumorousFacts {
    let mut facts = HumorousFacts::default();

    let about = category(content, "about page");
    let models = capture(&RE_MODELS, about);
    if let Some(models) = &models {
        facts.stats.models = models.clone();
    }
    // Known discrepancy with the formal template: a datasets match reports the
    // models count, and with no models line at all it reports the models
    // default ("1M+") instead of any datasets figure.
    if RE_DATASETS.is_match(about) {
        facts.stats.datasets = facts.stats.models.clone();
    }

    let customers = category(content, "customers page");
    let combined = format!("{}{}", about, customers);
    for company in ["NVIDIA", "Meta", "Amazon", "Google"] {
        if combined.contains(company) || (company == "Meta" && combined.contains("AI at Meta")) {
            facts.companies.push(company.to_string());
        }
    }

    let careers = category(content, "careers page");
    if careers.contains("Flexible Work") {
        facts.benefits.push("flexibility".to_string());
    }
    if careers.contains("Unlimited PTO") {
        facts.benefits.push("unlimited time off".to_string());
    }

    facts
}

pub fn humorous_brochure(company: &str, content: &ConsolidatedContent) -> String {
    let facts = humorous_facts(content);

    let mut customers = String::new();
    if facts.companies.iter().any(|c| c == "NVIDIA") {
        customers.push_str("- **NVIDIA**: With over 585 models on our platform.\n");
    }
    if facts.companies.iter().any(|c| c == "Meta") {
        customers.push_str("- **AI at Meta**: Using our resources to drive their innovation.\n");
    }
    let giants: Vec<&str> = ["Amazon", "Google"]
        .into_iter()
        .filter(|giant| facts.companies.iter().any(|c| c == giant))
        .collect();
    if !giants.is_empty() {
        customers.push_str(&format!(
            "- **{}**: They've also found their place in our community.\n",
            giants.join(" and ")
        ));
    }

    let perks = if facts.benefits.is_empty() {
        "great colleagues".to_string()
    } else {
        facts.benefits.join(", ")
    };

    format!(
        "# {company}\n\n\
         ### Summary\n\
         Our mission is to make AI as accessible as a coffee on the corner. We run a platform where the ML community collaborates on models, datasets, and apps, like one big algorithm party. 🎉 Come explore, create, and discover!\n\n\
         ### Value Proposition\n\
         Where AI lives! We build the world's largest collaboration platform for ML.\n\n\
         ### Products/Services\n\
         - **Models**: Over {models} models, from text generation to images. Find your algorithmic soulmate!\n\
         - **Datasets**: Access over {datasets} datasets for any ML task. It's like a free data buffet! 🍽️\n\
         - **Spaces**: Interactive apps where you can play with AI models in real time. More fun than an amusement park! 🎢\n\
         - **Enterprise Solutions**: Security and dedicated support for teams scaling their AI. Because AI needs a safe place to play too! 🏰\n\n\
         ### Customers\n\
         We serve everything from curious startups to the giants of the industry. If you're looking for an AI solution, you're in the right place!\n\
         {customers}\n\
         ### Culture\n\
         - **Diversity**: Every voice counts, like in a choir where every note matters. 🎶\n\
         - **Continuous Development**: Conferences and training are on us. Never stop learning!\n\
         - **Wellbeing**: Flexible hours and hybrid work. Life is more than just work!\n\n\
         ### Careers\n\
         Looking to join the fun? We're hiring passionate people from ML engineering to sales, with perks like {perks}.\n\n\
         ### Contact\n\
         We're here to help! Get in touch and we'll answer faster than a GPU on a good day. 👋\n\n\
         {legal}",
        company = company,
        models = facts.stats.models,
        datasets = facts.stats.datasets,
        customers = customers,
        perks = perks,
        legal = LEGAL_NOTE,
    )
}
