//! 本地关键词模板
//!
//! 每个智能体家族一张有序规则表：问题转小写后逐条匹配，第一条命中的规则生效，
//! 表尾的默认规则（条件为空）总能命中。部分家族在带上下文时追加一行 `Case Details:`。

use crate::agents::AgentFamily;
use crate::chat::ChatContext;

/// 关键词规则：`when` 为「与」的列表，每一项内部为「或」；为空时恒真
struct Rule {
    when: &'static [&'static [&'static str]],
    reply: &'static str,
}

impl Rule {
    fn matches(&self, lower: &str) -> bool {
        self.when
            .iter()
            .all(|any_of| any_of.iter().any(|k| lower.contains(k)))
    }
}

/// 投资调查助手规则（金融家族优先匹配）
const ASSISTANT_RULES: &[Rule] = &[
    Rule {
        when: &[&["financial fraud"], &["happen", "where", "location"]],
        reply: "The most recent financial fraud occurred in the stock market involving XYZ Corp. It was detected on May 12th, 2025. The suspected fraud involves insider trading within the company's senior management. Based on our analysis, the transactions originated from the company's headquarters in New York.",
    },
    Rule {
        when: &[&["stock"], &["manipulat", "fraud"]],
        reply: "The manipulated stocks are XYZ Corp, ABC Tech, and DEF Ltd. These stocks have experienced unusual trading volumes and price fluctuations, indicating possible insider trading. Our pattern analysis shows coordinated buying and selling activities just before major company announcements. The trading patterns suggest a sophisticated operation involving multiple accounts.",
    },
    Rule {
        when: &[&["crime"], &["categor", "type"]],
        reply: "Recent crime categories include theft, assault, fraud, and financial fraud. The most prevalent crimes are related to financial fraud, particularly stock manipulation cases. We've seen a 27% increase in financial crimes compared to last quarter, with stock manipulation being the fastest growing subcategory.",
    },
    Rule {
        when: &[&["exchange match", "exchange report"]],
        reply: "The latest exchange match report shows suspicious patterns between exchanges XYZ and ABC. These exchanges show significant discrepancies in transaction records, which suggest potential money laundering. Specifically, there's a $3.2M difference in reported transaction volumes for BTC/USD pairs between May 5-10, 2025. The transactions appear to be routed through multiple intermediaries to obscure their origin.",
    },
    Rule {
        when: &[&["recommend"], &["investigation"]],
        reply: "I recommend focusing on the trading history of XYZ Corp over the past three weeks. Investigate the top traders and check for connections with the company's executives. It seems that insider information may have been leaked to these traders. Additionally, examine the trading patterns of accounts associated with board member James Wilson, as his trading activity correlates strongly with the suspicious transactions. Consider obtaining a warrant to access his communication records.",
    },
    Rule {
        when: &[&["money"], &["launder"]],
        reply: "We've detected potential money laundering patterns involving cryptocurrency exchanges. The scheme appears to use a technique called 'layering' where funds move through multiple exchanges and wallets to obscure their origin. The primary indicators include: unusual transaction sizes, irregular timing patterns, and the use of privacy coins. I recommend investigating accounts associated with Offshore Holdings Ltd, as they appear to be the final destination for many of these transactions.",
    },
    Rule {
        when: &[&["trader", "suspect"]],
        reply: "Based on our analysis, the primary suspect in the XYZ Corp fraud case is likely a high-level executive with access to earnings reports before publication. Trading patterns suggest this person shared information with at least 5 external traders. The most suspicious activity comes from trader ID #TR-7842, who made unusually large purchases just 48 hours before the earnings announcement. This trader has connections to three board members according to social media analysis.",
    },
    Rule {
        when: &[&["timeline", "when"]],
        reply: "The timeline of the financial fraud appears to be: March 15, 2025 - Initial suspicious transactions detected; April 2, 2025 - Large stock purchases by suspected insiders; April 10, 2025 - Company announcement causing 30% stock price increase; April 11, 2025 - Massive sell-off by the same accounts. The pattern suggests a coordinated effort timed precisely with corporate announcements.",
    },
    Rule {
        when: &[&["evidence", "proof"]],
        reply: "The strongest evidence in the financial fraud case includes: 1) Trading records showing unusual options purchases before the announcement; 2) Communication metadata showing contact between suspects; 3) Timing correlation between information access and trading activity; 4) Unusual trading patterns deviating from historical behavior. I recommend securing electronic devices from the primary suspects to prevent evidence tampering.",
    },
    Rule {
        when: &[&["legal", "law", "regulation"]],
        reply: "This case involves potential violations of Securities Exchange Act Section 10(b) and SEC Rule 10b-5, which prohibit insider trading. To build a strong case, you'll need to establish: 1) The suspect possessed material non-public information; 2) The suspect had a duty to keep that information confidential; 3) The suspect breached that duty by sharing or acting on the information; 4) The suspect acted with intent (scienter). Consider consulting with the SEC enforcement division as they may have parallel investigations.",
    },
];

const FINANCE_RULES: &[Rule] = &[
    Rule {
        when: &[&["type", "categor"]],
        reply: "The financial fraud cases we're currently investigating include:\n\n• Insider Trading (38%)\n• Market Manipulation (27%)\n• Ponzi Schemes (15%)\n• Accounting Fraud (12%)\n• Money Laundering (8%)\n\nInsider trading at XYZ Corp is our highest priority case, with estimated damages of $1.25M.",
    },
    Rule {
        when: &[&["insider", "trading"]],
        reply: "Our insider trading investigation has identified:\n\n• 5 executives with suspicious trading patterns\n• 3 board members who may have leaked information\n• 12 external traders who acted on non-public information\n\nThe most significant case involves John Smith, who made $750,000 in profits from trades just before the XYZ Corp earnings announcement on May 12th, 2025.",
    },
    Rule {
        when: &[&["transaction", "pattern"]],
        reply: "Suspicious transaction patterns detected:\n\n• Rapid succession transfers between related entities\n• Round-number transactions ($500,000 exactly)\n• Transactions timed precisely before market announcements\n• Fragmented transactions just below reporting thresholds\n• Unusual trading hours (outside normal market hours)\n\nThese patterns are consistent with sophisticated financial fraud schemes.",
    },
    Rule {
        when: &[],
        reply: "I'm the Financial Fraud Investigation Agent. I can provide information about fraud types, stock manipulation, insider trading, money laundering, and suspicious transaction patterns. How can I assist with your investigation today?",
    },
];

const CRIME_RULES: &[Rule] = &[
    Rule {
        when: &[&["where", "location", "happen"]],
        reply: "Based on our crime mapping data, the most recent incidents have been concentrated in the downtown financial district. We've observed a 15% increase in financial crimes in this area over the past month. The most recent incident was reported at 123 Wall Street on May 1st, 2025.",
    },
    Rule {
        when: &[&["type", "categor"]],
        reply: "Our analysis shows the following crime categories in the past month:\n\n• Financial Fraud (42%)\n• Cyber Crime (28%)\n• Identity Theft (15%)\n• Physical Robbery (10%)\n• Other (5%)\n\nFinancial fraud remains the most prevalent category, with a significant increase in insider trading cases.",
    },
    Rule {
        when: &[&["statistic", "data", "numbers"]],
        reply: "Crime Statistics (Last 30 Days):\n\n• Total Reported Crimes: 127\n• Open Investigations: 84\n• Closed Cases: 43\n• Success Rate: 33.8%\n• Average Resolution Time: 18.5 days\n• High Severity Cases: 32 (25.2%)\n\nCompared to the previous month, we've seen a 12% increase in total reported crimes.",
    },
    Rule {
        when: &[&["suspect", "perpetrator", "criminal"]],
        reply: "Based on our analysis of recent crimes, the primary suspects in the financial district cases appear to be:\n\n• Organized groups with technical expertise (65% of cases)\n• Insider employees (22% of cases)\n• Individual opportunistic actors (13% of cases)\n\nThe suspect profile typically indicates individuals with financial sector knowledge and access to internal systems.",
    },
    Rule {
        when: &[&["evidence", "proof"]],
        reply: "The evidence collected in recent cases includes:\n\n• Digital transaction records\n• Surveillance footage from financial institutions\n• Witness testimonies from bank employees\n• Unusual access patterns to secure systems\n• Communication records between suspects\n\nForensic analysis of digital evidence has been particularly valuable in establishing connections between seemingly unrelated cases.",
    },
    Rule {
        when: &[],
        reply: "I'm the Crime Investigation Agent. I can provide information about crime locations, types, statistics, suspects, and evidence. How can I assist with your investigation today?",
    },
];

const EXCHANGE_RULES: &[Rule] = &[
    Rule {
        when: &[&["mismatch", "discrepanc"]],
        reply: "We've identified several critical exchange mismatches:\n\n• Transaction Volume Discrepancy: Global Exchange A reported $15M while Offshore Exchange B reported only $8M for identical trading pairs\n• Timing Discrepancy: International Exchange C and Regional Exchange D show a consistent 24-hour reporting delay pattern\n• Identity Mismatch: Transactions on Exchange G use corporate entities while matching transactions on Exchange H use individual names\n\nThese discrepancies strongly indicate deliberate reporting manipulation.",
    },
    Rule {
        when: &[&["pattern", "trend"]],
        reply: "Exchange matching analysis has revealed these patterns:\n\n• Cross-exchange arbitrage with impossible timing (faster than network latency allows)\n• Coordinated trading across multiple exchanges to manipulate market prices\n• Systematic reporting delays to exploit regulatory gaps\n• Identity switching between exchanges to obscure ownership\n\nThese patterns suggest sophisticated actors with deep understanding of exchange systems and regulatory blind spots.",
    },
    Rule {
        when: &[&["suspicious", "unusual"]],
        reply: "The most suspicious exchange activities involve:\n\n• Global Exchange A and Offshore Exchange B (92% confidence score)\n• International Exchange G and Local Exchange H (95% confidence score)\n• Crypto Exchange J and Forex Exchange I (88% confidence score)\n\nThese exchange pairs show consistent patterns of misreporting, with discrepancies that cannot be explained by legitimate trading activity or technical errors.",
    },
    Rule {
        when: &[&["money", "fund", "transfer"]],
        reply: "Our analysis of cross-exchange money movements shows:\n\n• $15M moved through the Global Exchange A → Offshore Exchange B channel with $7M unaccounted for\n• Systematic conversion between fiat and cryptocurrency to break audit trails\n• Funds ultimately flowing to accounts associated with Trading Group X and Offshore Company Y\n\nThe money flow patterns indicate a deliberate attempt to obscure the source and destination of funds.",
    },
    Rule {
        when: &[&["recommend", "suggest", "action"]],
        reply: "Based on exchange matching analysis, I recommend:\n\n• Immediate investigation of Global Exchange A and Offshore Exchange B transaction records\n• Freezing accounts associated with Trading Group X pending further investigation\n• Coordinating with international regulators to access Offshore Exchange B records\n• Conducting forensic accounting of all transactions between these exchanges from April-May 2025\n• Interviewing key personnel at Global Exchange A about reporting discrepancies",
    },
    Rule {
        when: &[],
        reply: "I'm the Exchange Matching Investigation Agent. I can provide information about exchange mismatches, suspicious patterns, money movements, and recommended actions. How can I assist with your investigation today?",
    },
];

const GENERAL_RULES: &[Rule] = &[
    Rule {
        when: &[&["about", "system", "what can you do"]],
        reply: "I'm the Police Investigation System Assistant. I can help with:\n\n• Crime analysis and mapping\n• Financial fraud detection and investigation\n• Exchange matching and discrepancy identification\n• Evidence collection and management\n• Case status tracking and reporting\n\nYou can ask me specific questions about cases, or switch to a specialized agent for deeper domain expertise.",
    },
    Rule {
        when: &[&["help", "how to"]],
        reply: "Here's how to use the Police Investigation System:\n\n• Navigate using the sidebar to access different modules\n• Use the chat interface to ask questions about cases\n• Switch between specialized agents for domain-specific assistance\n• Search for specific cases using the search bar\n• Generate reports from the Reports section\n\nIs there a specific feature you need help with?",
    },
    Rule {
        when: &[],
        reply: "I'm the Police Investigation System Assistant. I can provide general information about investigations, or you can switch to a specialized agent for Crime, Financial Fraud, or Exchange Matching. How can I assist you today?",
    },
];

const THEFT_RULES: &[Rule] = &[
    Rule {
        when: &[&["pattern", "trend"]],
        reply: "Based on our theft pattern analysis, we've identified:\n\n• Most thefts occur between 1-3 AM (68%)\n• Primary targets are electronic devices and cash\n• Entry points are typically unsecured windows (42%) and forced doors (38%)\n• Average theft value is $2,300 per incident\n• 72% of cases show signs of prior surveillance",
    },
    Rule {
        when: &[&["security", "prevent"]],
        reply: "To prevent future thefts, I recommend:\n\n• Install motion-activated lighting around entry points\n• Upgrade door locks to deadbolts with reinforced strike plates\n• Install window sensors and glass-break detectors\n• Use timer switches to simulate occupancy when premises are empty\n• Consider a visible security camera system as a deterrent\n• Maintain an inventory of valuable items with serial numbers",
    },
    Rule {
        when: &[&["evidence", "collect"]],
        reply: "For theft investigations, prioritize collecting:\n\n• Fingerprints from entry points and high-value item locations\n• Surveillance footage from the property and surrounding areas\n• Shoe impressions near entry/exit points\n• Tool marks on damaged locks or windows\n• Witness statements from neighbors about suspicious activity\n• Recent visitor logs or delivery records",
    },
    Rule {
        when: &[&["track", "recover", "stolen"]],
        reply: "To track stolen items, I recommend:\n\n• Check local pawn shops and online marketplaces (eBay, Facebook Marketplace, Craigslist)\n• Activate tracking features on stolen electronics if available\n• Monitor for serial numbers appearing in reseller databases\n• Coordinate with neighboring jurisdictions as thieves often sell items outside their theft area\n• Check with confidential informants who specialize in stolen goods",
    },
    Rule {
        when: &[],
        reply: "I'm Agent Theft, specialized in theft investigations and pattern analysis. I can provide insights on theft patterns, security recommendations, evidence collection strategies, and stolen goods tracking. How can I assist with your investigation today?",
    },
];

const CHAIN_SNATCHING_RULES: &[Rule] = &[
    Rule {
        when: &[&["hotspot", "location", "where"]],
        reply: "Chain snatching hotspot analysis shows:\n\n• Market areas with high pedestrian traffic (42% of incidents)\n• Public transportation entry/exit points (28%)\n• Tourist-frequented areas (18%)\n• Poorly lit residential streets near main roads (12%)\n\nThe highest concentration is currently in the Central Market district between 5-7 PM.",
    },
    Rule {
        when: &[&["victim", "target"]],
        reply: "Chain snatching victim profile analysis indicates:\n\n• Primary targets are women (76%) wearing visible gold jewelry\n• Age demographic is typically 40-65 years (62%)\n• Victims are usually alone or in pairs (88%)\n• Most victims are distracted by shopping, phone use, or conversation\n• Tourists and visitors unfamiliar with local crime patterns are frequently targeted",
    },
    Rule {
        when: &[&["offender", "suspect", "criminal"]],
        reply: "Chain snatching offender analysis shows:\n\n• Typically young males aged 18-25 (82%)\n• Usually operate in pairs - one snatcher, one getaway driver\n• Use motorcycles or scooters for quick escape (74%)\n• Often wear helmets to conceal identity and protect during escape\n• Most active during evening rush hours (5-7 PM)\n• Typically sell stolen items to specific gold buyers within 24 hours",
    },
    Rule {
        when: &[&["prevent", "strategy", "stop"]],
        reply: "Effective chain snatching prevention strategies include:\n\n• Increased visible police presence at identified hotspots\n• Plainclothes officers in high-risk areas\n• Public awareness campaigns targeting potential victims\n• CCTV monitoring at key locations with real-time alerts\n• Coordination with jewelry stores and gold buyers to identify stolen items\n• Community WhatsApp groups for real-time incident reporting",
    },
    Rule {
        when: &[],
        reply: "I'm Agent Chain Snatching, specialized in chain snatching cases and criminal profiling. I can provide insights on hotspot mapping, victim profiles, offender tracking, and prevention strategies. How can I assist with your investigation today?",
    },
];

const MURDER_RULES: &[Rule] = &[
    Rule {
        when: &[&["forensic", "evidence"]],
        reply: "Critical forensic priorities for homicide investigation:\n\n• Secure crime scene and establish chain of custody immediately\n• Document body position, lividity, and rigor mortis before moving\n• Collect trace evidence (hair, fibers, DNA) before body removal\n• Photograph and document blood spatter patterns for reconstruction\n• Collect fingerprints, footprints, and tool marks\n• Preserve digital evidence (phones, computers, surveillance)",
    },
    Rule {
        when: &[&["motive", "why"]],
        reply: "Common homicide motives to investigate:\n\n• Personal conflict (38% of cases) - examine recent arguments, threats\n• Financial gain (22%) - check victim's will, insurance, business dealings\n• Domestic violence (18%) - review relationship history, prior incidents\n• Criminal activity (12%) - examine victim's connections to illegal activities\n• Mental illness (8%) - look for behavioral patterns, prior incidents\n• Mistaken identity (2%) - consider if intended target was someone else",
    },
    Rule {
        when: &[&["suspect", "profile", "who"]],
        reply: "Homicide suspect profiling considerations:\n\n• Start with victim's close circle - 64% of homicides are committed by someone known to the victim\n• Examine relationship history - spouses, partners, family members\n• Check for financial beneficiaries of victim's death\n• Review victim's last 24-48 hours of activity and contacts\n• Analyze crime scene for signs of planning vs. impulsive action\n• Consider level of violence as indicator of relationship to victim",
    },
    Rule {
        when: &[&["timeline", "when"]],
        reply: "Homicide timeline reconstruction steps:\n\n• Establish time of death (TOD) through body temperature, lividity, stomach contents\n• Document victim's last known activities and communications\n• Collect and analyze digital footprints (phone records, social media, GPS)\n• Interview witnesses about victim's movements prior to death\n• Review surveillance footage from relevant locations\n• Create timeline visualization to identify gaps and inconsistencies",
    },
    Rule {
        when: &[],
        reply: "I'm Agent Murder, specialized in homicide investigations and forensic analysis. I can provide insights on forensic priorities, motive assessment, suspect profiling, and timeline reconstruction. How can I assist with your investigation today?",
    },
];

const ACCIDENT_RULES: &[Rule] = &[
    Rule {
        when: &[&["reconstruct", "how"]],
        reply: "Accident reconstruction methodology:\n\n• Document scene with photos, videos, and measurements before evidence is moved\n• Collect physical evidence (skid marks, debris field, point of impact)\n• Measure and document vehicle damage patterns\n• Interview witnesses for visual perspectives\n• Analyze vehicle data recorders (black boxes) if available\n• Create scaled diagrams and 3D models for analysis\n• Calculate speeds based on skid marks, damage, and final positions",
    },
    Rule {
        when: &[&["cause", "why"]],
        reply: "Common accident causes to investigate:\n\n• Driver factors (68%): impairment, distraction, fatigue, speeding\n• Vehicle factors (12%): mechanical failures, maintenance issues\n• Environmental factors (14%): road conditions, weather, visibility\n• Infrastructure factors (6%): road design, signage, traffic control\n\nAlways consider multiple contributing factors rather than a single cause.",
    },
    Rule {
        when: &[&["negligence", "fault", "liability"]],
        reply: "Negligence assessment framework:\n\n• Duty of care: Establish what standard of care was required\n• Breach of duty: Determine if actions fell below required standard\n• Causation: Establish direct link between breach and damages\n• Damages: Document injuries, property damage, and other losses\n\nCollect evidence of potential negligence indicators:\n• Violation of traffic laws or regulations\n• Distracted driving (phone records, witness statements)\n• Impairment (toxicology results)\n• Vehicle maintenance records\n• Prior similar incidents or patterns",
    },
    Rule {
        when: &[&["evidence", "collect"]],
        reply: "Critical evidence for accident investigation:\n\n• Scene documentation: photos, videos, measurements, drone footage\n• Physical evidence: tire marks, gouges, fluid trails, debris field\n• Vehicle data: EDR data, damage patterns, mechanical condition\n• Environmental factors: road conditions, weather reports, visibility\n• Witness statements: perspectives from different angles\n• Video evidence: traffic cameras, dashcams, security footage\n• Medical records: injuries consistent with accident dynamics\n• Digital evidence: phone records, GPS data, social media",
    },
    Rule {
        when: &[],
        reply: "I'm Agent Accident, specialized in accident reconstruction and investigation. I can provide insights on reconstruction methodology, cause analysis, negligence assessment, and evidence collection. How can I assist with your investigation today?",
    },
];

const ABUSE_RULES: &[Rule] = &[
    Rule {
        when: &[&["victim", "support"]],
        reply: "Victim-centered approach for abuse cases:\n\n• Ensure immediate safety and medical needs are addressed\n• Conduct interviews in safe, comfortable environments\n• Use trauma-informed questioning techniques\n• Connect victims with appropriate support services:\n  - Emergency housing/shelter options\n  - Medical care and mental health services\n  - Legal advocacy and protection orders\n  - Financial assistance resources\n• Minimize repeated interviews to prevent re-traumatization\n• Keep victims informed about case progress and safety planning",
    },
    Rule {
        when: &[&["pattern", "identify"]],
        reply: "Abuse pattern indicators to document:\n\n• Escalation in frequency and severity over time\n• Cycle patterns: tension building → incident → reconciliation → calm\n• Power and control tactics: isolation, economic control, intimidation\n• Previous incidents and reports (even if withdrawn)\n• Digital evidence of control: excessive texts, location tracking\n• Witness accounts of behavioral changes in victim\n• Medical history showing injuries consistent with abuse\n\nDocumenting patterns is critical for establishing the ongoing nature of abuse.",
    },
    Rule {
        when: &[&["risk", "danger"]],
        reply: "High-risk indicators in abuse cases:\n\n• Threats of homicide or suicide\n• Access to weapons\n• Recent separation or threats of separation\n• Extreme jealousy or possessiveness\n• Strangulation attempts (increases homicide risk by 750%)\n• Controlling behaviors and stalking\n• Violation of protection orders\n• Substance abuse issues\n• Unemployment or financial stress\n\nIf multiple high-risk factors are present, consider immediate safety interventions and monitoring.",
    },
    Rule {
        when: &[&["evidence", "document"]],
        reply: "Critical evidence in abuse investigations:\n\n• Photographs of injuries (immediate and follow-up as bruises develop)\n• Medical records and examiner statements\n• 911 calls and police reports (current and previous)\n• Text messages, emails, voicemails showing threats or control\n• Social media posts or messages\n• Witness statements from family, friends, neighbors\n• Video/audio recordings of incidents\n• Journal entries or documentation kept by victim\n• Protection orders and violation documentation",
    },
    Rule {
        when: &[],
        reply: "I'm Agent Abuse, specialized in abuse cases and victim support. I can provide insights on victim-centered approaches, pattern recognition, risk assessment, and evidence collection for abuse cases. How can I assist with your investigation today?",
    },
];

fn first_match<'a>(tables: &[&'a [Rule]], lower: &str) -> Option<&'a str> {
    tables
        .iter()
        .flat_map(|t| t.iter())
        .find(|r| r.matches(lower))
        .map(|r| r.reply)
}

/// 案件摘要行所用的默认标题与优先级
fn case_defaults(family: AgentFamily) -> Option<(&'static str, &'static str)> {
    match family {
        AgentFamily::Theft => Some(("Theft Case", "Medium")),
        AgentFamily::ChainSnatching => Some(("Chain Snatching Case", "Medium")),
        AgentFamily::Murder => Some(("Homicide Case", "High")),
        AgentFamily::Accident => Some(("Accident Case", "Medium")),
        AgentFamily::Abuse => Some(("Abuse Case", "High")),
        _ => None,
    }
}

fn case_details(ctx: &ChatContext, title: &str, priority: &str) -> String {
    format!(
        "\n\nCase Details: {} | {} | Priority: {} | Status: {}",
        ctx.case_id.as_deref().unwrap_or("N/A"),
        ctx.case_title.as_deref().unwrap_or(title),
        ctx.case_priority.as_deref().unwrap_or(priority),
        ctx.case_status.as_deref().unwrap_or("Open"),
    )
}

fn persona_prefix(agent_type: &str) -> Option<&'static str> {
    match agent_type {
        "murder-chief" => Some("As the Murder Chief, I'm leading the investigation on Murder Case 1. "),
        "murder-cop-2" => {
            Some("As Murder Cop 2, I'm working on Murder Case 2 which is currently in progress. ")
        }
        "murder-case-3" => Some(
            "As the specialized investigator for Murder Case 3, I'm focusing on this complex open case. ",
        ),
        _ => None,
    }
}

/// 按智能体类型生成本地回复；总是返回非空文本
pub fn generate(agent_type: &str, question: &str, context: Option<&ChatContext>) -> String {
    let family = AgentFamily::of(agent_type);
    let lower = question.to_lowercase();

    let tables: &[&[Rule]] = match family {
        AgentFamily::Finance => &[ASSISTANT_RULES, FINANCE_RULES],
        AgentFamily::Crime => &[CRIME_RULES],
        AgentFamily::Exchange => &[EXCHANGE_RULES],
        AgentFamily::Theft => &[THEFT_RULES],
        AgentFamily::ChainSnatching => &[CHAIN_SNATCHING_RULES],
        AgentFamily::Murder => &[MURDER_RULES],
        AgentFamily::Accident => &[ACCIDENT_RULES],
        AgentFamily::Abuse => &[ABUSE_RULES],
        AgentFamily::General => &[GENERAL_RULES],
    };

    let body = first_match(tables, &lower).unwrap_or(GENERAL_RULES[GENERAL_RULES.len() - 1].reply);

    let mut out = String::new();
    if let Some(prefix) = persona_prefix(agent_type) {
        out.push_str(prefix);
    }
    out.push_str(body);
    if let (Some(ctx), Some((title, priority))) = (context, case_defaults(family)) {
        out.push_str(&case_details(ctx, title, priority));
    }
    out
}
