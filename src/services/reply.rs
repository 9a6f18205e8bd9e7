use chrono::{FixedOffset, Local, Timelike, Utc};

/// Where the composer reads the hour of day from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    Local,
    Offset(FixedOffset),
    Fixed(u32),
}

impl Clock {
    pub fn hour(&self) -> u32 {
        match self {
            Clock::Local => Local::now().hour(),
            Clock::Offset(offset) => Utc::now().with_timezone(offset).hour(),
            Clock::Fixed(hour) => *hour % 24,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Greeting,
    Property,
    Rental,
    Price,
    Location,
    Help,
    Thanks,
    Urgent,
    Viewing,
    Finance,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::Property => "property",
            Intent::Rental => "rental",
            Intent::Price => "price",
            Intent::Location => "location",
            Intent::Help => "help",
            Intent::Thanks => "thanks",
            Intent::Urgent => "urgent",
            Intent::Viewing => "viewing",
            Intent::Finance => "finance",
        }
    }
}

pub struct ReplyContext<'a> {
    pub greeting: &'static str,
    pub business_name: &'a str,
    pub within_business_hours: bool,
}

impl ReplyContext<'_> {
    fn hours_notice(&self) -> &'static str {
        if self.within_business_hours {
            ""
        } else {
            " ⏰ We're currently outside 9–6 business hours."
        }
    }
}

pub struct KeywordRule {
    pub intent: Intent,
    pub keywords: &'static [&'static str],
    pub render: fn(&ReplyContext) -> String,
}

fn greeting_reply(ctx: &ReplyContext) -> String {
    format!(
        "{}! Thanks for contacting {}.{}",
        ctx.greeting,
        ctx.business_name,
        ctx.hours_notice()
    )
}

fn property_reply(ctx: &ReplyContext) -> String {
    format!("🏠 Property inquiry noted. {}! Our experts will reach out soon.", ctx.greeting)
}

fn rental_reply(ctx: &ReplyContext) -> String {
    format!("🏡 Rental inquiry noted. {}! We'll call you within 2 hours.", ctx.greeting)
}

fn price_reply(ctx: &ReplyContext) -> String {
    format!(
        "💰 Pricing info requested. {}! Our sales team will share rates shortly.",
        ctx.greeting
    )
}

fn location_reply(ctx: &ReplyContext) -> String {
    format!("📍 Location inquiry noted. {}! We'll send area details soon.", ctx.greeting)
}

fn help_reply(ctx: &ReplyContext) -> String {
    format!("🤝 Support is on the way. {}! Our team will assist you shortly.", ctx.greeting)
}

fn thanks_reply(_ctx: &ReplyContext) -> String {
    "😊 You're welcome! Happy to help.".to_string()
}

fn urgent_reply(ctx: &ReplyContext) -> String {
    format!(
        "🚨 Marked as urgent. {}! A senior agent will call you right away.{}",
        ctx.greeting,
        ctx.hours_notice()
    )
}

fn viewing_reply(ctx: &ReplyContext) -> String {
    format!(
        "📅 Site visit request noted. {}! We'll confirm a viewing slot shortly.",
        ctx.greeting
    )
}

fn finance_reply(ctx: &ReplyContext) -> String {
    format!(
        "🏦 Home-loan query noted. {}! Our finance desk will share EMI options soon.",
        ctx.greeting
    )
}

/// Routing table. Evaluated top to bottom; the first rule with a matching keyword wins.
pub const RULES: &[KeywordRule] = &[
    KeywordRule {
        intent: Intent::Greeting,
        keywords: &["hi", "hello", "hey", "hii", "namaste"],
        render: greeting_reply,
    },
    KeywordRule {
        intent: Intent::Property,
        keywords: &["property", "properties", "real estate", "flat", "apartment", "house"],
        render: property_reply,
    },
    KeywordRule {
        intent: Intent::Rental,
        keywords: &["rent", "rental", "renting", "lease"],
        render: rental_reply,
    },
    KeywordRule {
        intent: Intent::Price,
        keywords: &["price", "pricing", "cost", "budget", "rate", "rates"],
        render: price_reply,
    },
    KeywordRule {
        intent: Intent::Location,
        keywords: &["location", "where", "area", "address"],
        render: location_reply,
    },
    KeywordRule {
        intent: Intent::Help,
        keywords: &["help", "support"],
        render: help_reply,
    },
    KeywordRule {
        intent: Intent::Thanks,
        keywords: &["thank", "thanks", "thankyou", "thx"],
        render: thanks_reply,
    },
    KeywordRule {
        intent: Intent::Urgent,
        keywords: &["urgent", "asap", "immediately", "emergency"],
        render: urgent_reply,
    },
    KeywordRule {
        intent: Intent::Viewing,
        keywords: &["visit", "viewing", "site visit", "tour", "schedule"],
        render: viewing_reply,
    },
    KeywordRule {
        intent: Intent::Finance,
        keywords: &["loan", "emi", "finance", "mortgage"],
        render: finance_reply,
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedReply {
    pub intent: Option<Intent>,
    pub body: String,
}

pub fn greeting_for_hour(hour: u32) -> &'static str {
    if hour < 12 {
        "Good Morning"
    } else if hour < 17 {
        "Good Afternoon"
    } else {
        "Good Evening"
    }
}

pub fn within_business_hours(hour: u32) -> bool {
    (9..=18).contains(&hour)
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// Endings accepted after a keyword of four or more letters ("prices", "rented").
// Shorter keywords must match exactly so "hi" does not pick up "his".
const INFLECTIONS: [&str; 5] = ["s", "es", "d", "ed", "ing"];

fn token_matches(token: &str, keyword: &str) -> bool {
    if token == keyword {
        return true;
    }
    keyword.chars().count() >= 4
        && token
            .strip_prefix(keyword)
            .is_some_and(|rest| INFLECTIONS.contains(&rest))
}

fn keyword_matches(tokens: &[String], keyword: &str) -> bool {
    let parts: Vec<&str> = keyword.split_whitespace().collect();
    if parts.is_empty() || parts.len() > tokens.len() {
        return false;
    }
    tokens
        .windows(parts.len())
        .any(|window| window.iter().zip(&parts).all(|(t, k)| token_matches(t, k)))
}

/// First rule whose keywords appear in `text`, if any.
pub fn route(text: &str) -> Option<&'static KeywordRule> {
    let tokens = tokenize(text);
    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| keyword_matches(&tokens, k)))
}

pub fn compose_reply(text: &str, hour: u32, business_name: &str) -> ComposedReply {
    let ctx = ReplyContext {
        greeting: greeting_for_hour(hour),
        business_name,
        within_business_hours: within_business_hours(hour),
    };

    match route(text) {
        Some(rule) => ComposedReply {
            intent: Some(rule.intent),
            body: (rule.render)(&ctx),
        },
        None => ComposedReply {
            intent: None,
            body: format!(
                "{}! Welcome to {}. How can we assist you today?",
                ctx.greeting, business_name
            ),
        },
    }
}

pub fn with_resource_link(body: &str, link: &str) -> String {
    format!("{}\n\n📊 Your personal property sheet: {}", body, link)
}
