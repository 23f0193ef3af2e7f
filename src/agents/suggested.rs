//! 每类智能体的推荐问题

const GENERAL: &[&str] = &[
    "What can you help me with?",
    "Tell me about the latest cases",
    "How do I analyze evidence?",
    "What investigation techniques should I use?",
];

const CRIME: &[&str] = &[
    "What are the recent crime statistics in the area?",
    "How do I report suspicious activity?",
    "What evidence is needed for a crime investigation?",
    "How are crime scenes processed?",
];

const MURDER: &[&str] = &[
    "What are the key steps in a homicide investigation?",
    "How is forensic evidence collected at a murder scene?",
    "What techniques are used for suspect profiling?",
    "How are witness testimonies verified?",
];

const FINANCE: &[&str] = &[
    "What are common financial fraud indicators?",
    "How do you trace money laundering activities?",
    "What financial documents should be analyzed in fraud cases?",
    "How are digital financial crimes investigated?",
];

const THEFT: &[&str] = &[
    "What are the most common theft patterns?",
    "How do you track stolen goods?",
    "What security measures prevent theft?",
    "How do you identify professional thieves?",
];

const SMUGGLE: &[&str] = &[
    "What are common smuggling routes?",
    "How are smuggled goods detected?",
    "What technologies are used to prevent smuggling?",
    "How do international agencies coordinate on smuggling cases?",
];

const MURDER_CHIEF: &[&str] = &[
    "What resources are needed for a major homicide investigation?",
    "How do you coordinate multiple detective teams?",
    "What are the protocols for high-profile murder cases?",
    "How do you handle media relations during murder investigations?",
];

const MURDER_COP_2: &[&str] = &[
    "What are the standard procedures for securing a murder scene?",
    "How do you conduct initial witness interviews?",
    "What evidence collection protocols should be followed?",
    "How do you coordinate with forensic teams?",
];

const MURDER_CASE_3: &[&str] = &[
    "What are the key details of this case?",
    "Who are the primary suspects?",
    "What forensic evidence has been collected?",
    "Are there any witness statements to review?",
];

const ACCIDENT: &[&str] = &[
    "How do you determine if an accident was staged?",
    "What evidence is crucial in accident reconstruction?",
    "How do you analyze vehicle damage patterns?",
    "What factors indicate negligence in accidents?",
];

const ABUSE: &[&str] = &[
    "What are the signs of domestic abuse?",
    "How do you interview abuse victims sensitively?",
    "What evidence collection protocols exist for abuse cases?",
    "How do you ensure victim safety during investigations?",
];

/// 返回 (问题列表, 是否命中具体类型)；未知或缺省类型返回 general 列表
pub fn lookup(agent_type: Option<&str>) -> (&'static [&'static str], bool) {
    let list = match agent_type.unwrap_or("") {
        "general" => Some(GENERAL),
        "crime" => Some(CRIME),
        "murder" => Some(MURDER),
        "finance" => Some(FINANCE),
        "theft" => Some(THEFT),
        "smuggle" => Some(SMUGGLE),
        "murder-chief" => Some(MURDER_CHIEF),
        "murder-cop-2" => Some(MURDER_COP_2),
        "murder-case-3" => Some(MURDER_CASE_3),
        "crime-accident" => Some(ACCIDENT),
        "crime-abuse" => Some(ABUSE),
        _ => None,
    };
    match list {
        Some(list) => (list, true),
        None => (GENERAL, false),
    }
}

pub fn suggested_questions(agent_type: &str) -> &'static [&'static str] {
    lookup(Some(agent_type)).0
}
