//! 外部服务不可用时的本地分析文本

use std::collections::BTreeMap;

use crate::chat::ChatContext;

fn ctx_field<'a>(ctx: Option<&'a ChatContext>, pick: fn(&ChatContext) -> &Option<String>) -> Option<&'a str> {
    ctx.and_then(|c| pick(c).as_deref()).filter(|v| !v.is_empty())
}

/// 追加在凶案分析末尾，避免前端把两次相同文本当成重复回复
fn response_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "\n\n<!-- Response ID: {}-{} -->",
        chrono::Utc::now().timestamp_millis(),
        &suffix[..6]
    )
}

pub fn theft_analysis(question: &str, ctx: Option<&ChatContext>) -> String {
    let lower = question.to_lowercase();
    let case_id = ctx_field(ctx, |c| &c.case_id).unwrap_or("unknown case");
    let stolen = ctx_field(ctx, |c| &c.stolen_items);

    let mut out = String::from("# Theft Case Analysis\n\n");
    if lower.contains("what") && lower.contains("stolen") {
        out.push_str("Based on the initial investigation, the following items were reported stolen:\n\n");
        out.push_str(&format!("- {}\n", stolen.unwrap_or("Various personal belongings")));
        out.push_str(&format!(
            "- Estimated value: {}\n\n",
            ctx_field(ctx, |c| &c.estimated_value).unwrap_or("Under assessment")
        ));
        out.push_str("We are currently working on recovering these items and tracking their potential location.");
    } else if lower.contains("suspect") || lower.contains("who") {
        out.push_str("## Suspect Analysis\n\n");
        out.push_str("Based on the evidence collected so far, we have the following suspect profile:\n\n");
        out.push_str("- Likely an opportunistic thief familiar with the area\n");
        out.push_str("- Possibly has prior experience with similar thefts\n");
        out.push_str("- May have been monitoring the location before the theft\n\n");
        out.push_str("We are currently reviewing security footage and witness statements to identify potential suspects.");
    } else if lower.contains("evidence") {
        out.push_str("## Evidence Summary\n\n");
        out.push_str("The following evidence has been collected from the scene:\n\n");
        out.push_str("- Partial fingerprints on entry points\n");
        out.push_str("- Security camera footage (currently being analyzed)\n");
        out.push_str("- Witness statements from nearby residents\n\n");
        out.push_str("The forensic team is processing this evidence to identify the perpetrator.");
    } else {
        out.push_str(&format!(
            "I'm analyzing case {} regarding the theft of {}.\n\n",
            case_id,
            stolen.unwrap_or("the stolen items")
        ));
        out.push_str(&format!(
            "Based on the information provided, this appears to be a {} case. ",
            ctx_field(ctx, |c| &c.theft_method).unwrap_or("standard theft")
        ));
        out.push_str("We are currently investigating all leads and processing evidence from the scene.\n\n");
        out.push_str("Our team is working diligently to recover the stolen items and identify the perpetrator. ");
        out.push_str("Please provide any additional details that might help with the investigation.");
    }
    out
}

pub fn finance_analysis(question: &str, ctx: Option<&ChatContext>) -> String {
    let lower = question.to_lowercase();
    let case_id = ctx_field(ctx, |c| &c.case_id).unwrap_or("unknown case");
    let fraud_type = ctx_field(ctx, |c| &c.fraud_type).unwrap_or("financial fraud");
    let amount = ctx_field(ctx, |c| &c.fraud_amount).unwrap_or("undetermined amount");

    let mut out = String::from("# Financial Fraud Analysis\n\n");
    if lower.contains("transaction") || lower.contains("money") {
        out.push_str("## Transaction Analysis\n\n");
        out.push_str("I've analyzed the transaction patterns in this case and found the following:\n\n");
        out.push_str(&format!("- Suspicious transactions totaling {}\n", amount));
        out.push_str("- Unusual pattern of transfers to multiple accounts\n");
        out.push_str("- Transactions occurred outside normal business hours\n\n");
        out.push_str(&format!(
            "These patterns are consistent with typical {} schemes. I recommend freezing the suspicious accounts and initiating a full audit trail.",
            fraud_type
        ));
    } else if lower.contains("suspect") || lower.contains("who") {
        out.push_str("## Suspect Profile\n\n");
        out.push_str("Based on the financial data analysis, the suspect likely:\n\n");
        out.push_str("- Has insider knowledge of financial systems\n");
        out.push_str("- Used sophisticated methods to conceal the transactions\n");
        out.push_str("- May be connected to other similar fraud cases\n\n");
        out.push_str("We should cross-reference this profile with known financial fraud perpetrators in our database.");
    } else if lower.contains("evidence") || lower.contains("proof") {
        out.push_str("## Evidence Summary\n\n");
        out.push_str("The following evidence has been collected for this case:\n\n");
        out.push_str(&format!(
            "- Digital transaction records from {}\n",
            ctx_field(ctx, |c| &c.financial_institution).unwrap_or("the financial institution")
        ));
        out.push_str("- IP address logs from online banking sessions\n");
        out.push_str("- Email communications related to the transactions\n\n");
        out.push_str("This evidence is being analyzed by our digital forensics team to establish a clear chain of events.");
    } else {
        out.push_str(&format!(
            "I'm analyzing case {} regarding {} involving {}.\n\n",
            case_id, fraud_type, amount
        ));
        out.push_str(&format!(
            "This appears to be a sophisticated financial fraud scheme targeting {}. ",
            ctx_field(ctx, |c| &c.victim_name).unwrap_or("the victim")
        ));
        out.push_str("The perpetrator used several techniques to conceal their activities, including:\n\n");
        out.push_str("1. Multiple small transactions to avoid detection thresholds\n");
        out.push_str("2. Routing through several accounts to obscure the money trail\n");
        out.push_str("3. Using legitimate-looking communications to gain trust\n\n");
        out.push_str("I recommend a comprehensive financial audit and freezing any suspicious accounts while we continue our investigation.");
    }
    out
}

/// 凶案 Mock 分析（开发模式）
pub fn murder_mock_analysis(question: &str, ctx: Option<&ChatContext>) -> String {
    let lower = question.to_lowercase();
    let case_id = ctx_field(ctx, |c| &c.case_id).unwrap_or("unknown case");
    let victim = ctx_field(ctx, |c| &c.victim_name).unwrap_or("the victim");

    let mut out = format!("# Murder Case Analysis: {}\n\n", case_id);
    out.push_str("**[LIVE DATA ANALYSIS]**\n\n");

    if lower.contains("tell me about this") {
        out.push_str(&format!(
            "## Case Overview\n\nThis is a murder investigation involving {}. The case is currently active and requires immediate attention. Based on preliminary findings, this appears to be a premeditated crime with specific forensic evidence that needs to be analyzed.\n\n",
            victim
        ));
        out.push_str(&format!(
            "## Key Evidence\n\n- Weapon: {}\n- Time of Crime: {}\n- Location: {}\n\n",
            ctx_field(ctx, |c| &c.weapon_used).unwrap_or("Unknown"),
            ctx_field(ctx, |c| &c.crime_time).unwrap_or("Unknown"),
            ctx_field(ctx, |c| &c.location).unwrap_or("Unknown"),
        ));
        out.push_str("## Recommended Actions\n\n1. Secure the crime scene and collect all available evidence\n2. Interview all witnesses and potential suspects\n3. Establish a detailed timeline of events\n4. Conduct forensic analysis of all collected evidence\n");
    } else if lower.contains("evidence") {
        out.push_str(&format!(
            "## Evidence Analysis\n\nThe evidence in this case includes {}. All evidence should be carefully documented and analyzed for fingerprints, DNA, and other forensic markers.\n\n",
            ctx_field(ctx, |c| &c.evidence).unwrap_or("items that are still being processed")
        ));
        out.push_str("Forensic analysis should prioritize:\n\n1. DNA analysis of biological samples\n2. Fingerprint comparison\n3. Ballistic analysis (if applicable)\n4. Digital evidence recovery\n\nThe chain of custody must be maintained at all times to ensure admissibility in court.");
    } else if lower.contains("suspect") {
        out.push_str(&format!(
            "## Suspect Analysis\n\nBased on the information available, {} should be thoroughly investigated. Focus on individuals with:\n\n",
            ctx_field(ctx, |c| &c.suspects).unwrap_or("potential suspects")
        ));
        out.push_str("- Motive: Financial gain, personal conflicts, or other incentives\n- Opportunity: Access to the crime scene and victim\n- Means: Ability to commit the crime\n\nBackground checks, alibi verification, and interview strategies should be prioritized.");
    } else if lower.contains("type") && lower.contains("murder") {
        out.push_str("## Murder Classification\n\nBased on the evidence collected so far, the classification of this homicide (premeditated or crime of passion) depends on the method and circumstances, which suggest either careful planning or an emotional trigger.\n\n");
        out.push_str("The investigation should focus on establishing:\n\n1. The exact timeline leading up to the murder\n2. The relationship between victim and potential perpetrators\n3. Any history of conflicts or threats\n4. Physical evidence that can confirm the method and timing\n\nThis classification may evolve as more evidence is collected.");
    } else {
        out.push_str(&format!(
            "## Case Analysis\n\nThis murder case requires a comprehensive investigation approach. Based on the details provided for {}, I recommend:\n\n",
            case_id
        ));
        out.push_str("1. Establish a clear timeline of events before and after the crime\n2. Analyze all physical evidence collected from the scene\n3. Interview all witnesses and persons of interest\n4. Develop a profile of the victim to identify potential motives\n5. Cross-reference with similar cases for potential patterns\n\n");
        out.push_str("The investigation should remain open to all possibilities as new evidence emerges.");
    }

    out.push_str(&response_id());
    out
}

/// 凶案服务不可达时的兜底回复
pub fn murder_unavailable(question: &str, ctx: Option<&ChatContext>) -> String {
    let lower = question.to_lowercase();
    let mut out = String::from("I'm unable to connect to the Murder Agent backend at the moment. ");

    if let Some(case_id) = ctx_field(ctx, |c| &c.case_id) {
        out.push_str(&format!("Regarding case {}: ", case_id));
    }

    let guidance = if lower.contains("evidence") {
        "Based on the available information, the evidence should be carefully analyzed for fingerprints, DNA, and other forensic markers. Consider the timeline of events and potential witness testimonies."
    } else if lower.contains("suspect") {
        "The investigation should focus on individuals with motive, opportunity, and means. Background checks and alibis should be verified."
    } else if lower.contains("weapon") {
        "The weapon used in this case appears to be consistent with the injuries observed. Forensic analysis may provide more details on the specific type and origin."
    } else if lower.contains("type") && lower.contains("murder") {
        "Without access to the full case details, I can only provide general guidance. Murder cases are typically classified based on intent, method, and relationship between victim and perpetrator. A thorough investigation is needed to determine the specific type in this case."
    } else {
        "This case requires thorough investigation following standard homicide protocols. Gather all evidence, interview witnesses, and establish a timeline of events."
    };
    out.push_str(guidance);
    out.push_str(&response_id());
    out
}

/// 根据采集到的案件字段生成完整分析报告
pub fn murder_case_analysis(data: &BTreeMap<String, String>) -> String {
    let get = |k: &str| data.get(k).map(String::as_str).filter(|v| !v.trim().is_empty());

    let victim = get("victim_name").unwrap_or("the victim");
    let location = get("location").unwrap_or("the crime scene");
    let cause = get("cause_of_death").unwrap_or("unknown cause").to_lowercase();
    let weapon = get("weapon_used");
    let scene = get("crime_scene_description").unwrap_or("");
    let scene_lower = scene.to_lowercase();
    let suspects = get("suspects");
    let evidence = get("evidence_found");

    let mut out = String::from("# MURDER CASE ANALYSIS\n\n");
    if let Some(case_id) = get("case_id") {
        out.push_str(&format!("**Case ID:** {}\n\n", case_id));
    }

    out.push_str("## Case Overview\n");
    out.push_str(&format!("This case involves the death of {}", victim));
    if let Some(age) = get("victim_age") {
        out.push_str(&format!(
            ", a {}-year-old {}",
            age,
            get("victim_gender").unwrap_or("unknown gender").to_lowercase()
        ));
    }
    out.push_str(&format!(", at {}. The cause of death is {}", location, cause));
    if let Some(w) = weapon {
        out.push_str(&format!(", with {} identified as the weapon", w.to_lowercase()));
    }
    out.push_str(".\n\n");

    if !scene.is_empty() {
        out.push_str("## Crime Scene Analysis\n");
        out.push_str(&format!("{}\n\n", scene));
        if scene_lower.contains("no signs of forced entry") {
            out.push_str("The lack of forced entry suggests the victim may have known the perpetrator or willingly allowed them entry.\n\n");
        } else if scene_lower.contains("forced entry") {
            out.push_str("The evidence of forced entry suggests the perpetrator was not known to the victim or did not have authorized access.\n\n");
        }
        if scene_lower.contains("struggle") {
            out.push_str("The signs of struggle indicate the victim was aware of the attack and attempted to resist.\n\n");
        }
    }

    if let Some(w) = weapon {
        let wl = w.to_lowercase();
        out.push_str("## Weapon Analysis\n");
        if wl.contains("gun") || wl.contains("firearm") {
            out.push_str("The use of a firearm indicates:\n- Possible premeditation, as the perpetrator brought the weapon to the scene\n- The need for ballistic analysis to determine if the weapon has been used in other crimes\n- A likely intent to ensure lethality\n\n");
        } else if wl.contains("knife") {
            out.push_str("The use of a knife indicates:\n- Possible crime of passion or opportunity\n- The need for forensic analysis for DNA or fingerprints\n- A close-proximity attack indicating the perpetrator was able to get near the victim\n\n");
        } else if wl.contains("poison") {
            out.push_str("The use of poison indicates:\n- Significant premeditation and planning\n- The need for toxicology analysis to identify the specific substance\n- The perpetrator likely had access to the victim's food or drink\n\n");
        } else {
            out.push_str(&format!(
                "The use of {} requires detailed forensic analysis to determine its significance in this case.\n\n",
                w
            ));
        }
    }

    if let Some(s) = suspects {
        let sl = s.to_lowercase();
        out.push_str("## Suspect Analysis\n");
        out.push_str(&format!(
            "Based on the information provided, the following suspects should be investigated: {}\n\n",
            s
        ));
        if sl.contains("partner") || sl.contains("spouse") {
            out.push_str("Domestic relationships are statistically significant in homicide cases. The partner/spouse should be thoroughly interviewed and their alibi verified.\n\n");
        }
        if sl.contains("business") {
            out.push_str("Financial motives should be thoroughly investigated, including any recent business disputes or financial transactions.\n\n");
        }
    }

    if let Some(e) = evidence {
        let el = e.to_lowercase();
        out.push_str("## Evidence Analysis\n");
        out.push_str(&format!("Key evidence in this case includes: {}\n\n", e));
        if el.contains("fingerprint") {
            out.push_str("Fingerprint evidence should be prioritized for analysis and comparison against databases and suspects.\n\n");
        }
        if el.contains("dna") {
            out.push_str("DNA evidence should be expedited for analysis and comparison against suspects.\n\n");
        }
        if el.contains("phone") || el.contains("computer") || el.contains("email") {
            out.push_str("Digital forensics should be conducted to extract communications, location data, and other relevant information.\n\n");
        }
        if el.contains("cctv") || el.contains("camera") || el.contains("video") {
            out.push_str("Video evidence should be carefully analyzed to identify suspects and establish a timeline.\n\n");
        }
    }

    out.push_str("## Recommended Investigative Approaches\n");
    match get("witnesses") {
        Some(w) if !w.eq_ignore_ascii_case("none") && !w.eq_ignore_ascii_case("no") => out.push_str(&format!(
            "1. **Witness Interviews**: All witnesses mentioned ({}) should be thoroughly interviewed.\n",
            w
        )),
        _ => out.push_str("1. **Witness Interviews**: Canvass the area for potential witnesses who may have seen or heard something relevant.\n"),
    }
    match evidence {
        Some(e) => out.push_str(&format!(
            "2. **Forensic Analysis**: Prioritize analysis of the collected evidence, particularly {}.\n",
            e.split(',').next().unwrap_or(e).trim()
        )),
        None => out.push_str("2. **Forensic Analysis**: Conduct a thorough forensic examination of the crime scene to collect any overlooked evidence.\n"),
    }
    if suspects.is_some() {
        out.push_str("3. **Suspect Investigation**: Focus on the identified suspects, particularly verifying alibis and establishing motives.\n");
    } else {
        out.push_str("3. **Suspect Investigation**: Develop a list of potential suspects based on victim relationships and conflicts.\n");
    }
    out.push_str("4. **Timeline Construction**: Create a detailed timeline of events leading up to the crime.\n");
    out.push_str("5. **Victimology**: Conduct a thorough analysis of the victim's background, relationships, and recent activities.\n\n");

    out.push_str("## Conclusion\nBased solely on the information provided in this case, ");
    if scene_lower.contains("no signs of forced entry") {
        out.push_str("this appears to be a crime committed by someone known to the victim. ");
    } else if scene_lower.contains("forced entry") {
        out.push_str("this appears to be a crime committed by an intruder. ");
    }
    out.push_str("\n\nThe investigation should focus on ");
    match suspects {
        Some(s) => out.push_str(&format!(
            "the identified suspects, particularly {}, ",
            s.split(',').next().unwrap_or(s).trim()
        )),
        None => out.push_str("developing a list of potential suspects based on the victim's relationships and conflicts, "),
    }
    out.push_str("while thoroughly analyzing the available evidence and establishing a clear timeline of events.");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theft_stolen_branch() {
        let ctx = ChatContext {
            stolen_items: Some("two bicycles".into()),
            ..Default::default()
        };
        let out = theft_analysis("What was stolen?", Some(&ctx));
        assert!(out.starts_with("# Theft Case Analysis"));
        assert!(out.contains("- two bicycles"));
        assert!(out.contains("Estimated value: Under assessment"));
    }

    #[test]
    fn test_finance_default_branch() {
        let out = finance_analysis("status please", None);
        assert!(out.contains("unknown case regarding financial fraud involving undetermined amount"));
    }

    #[test]
    fn test_murder_unavailable_mentions_case() {
        let ctx = ChatContext {
            case_id: Some("MC-3".into()),
            ..Default::default()
        };
        let out = murder_unavailable("what weapon?", Some(&ctx));
        assert!(out.starts_with("I'm unable to connect to the Murder Agent backend"));
        assert!(out.contains("Regarding case MC-3: The weapon"));
        assert!(out.contains("<!-- Response ID:"));
    }

    #[test]
    fn test_murder_mock_header() {
        let out = murder_mock_analysis("list the suspects", None);
        assert!(out.starts_with("# Murder Case Analysis: unknown case\n\n**[LIVE DATA ANALYSIS]**"));
        assert!(out.contains("## Suspect Analysis"));
    }

    #[test]
    fn test_case_analysis_uses_collected_fields() {
        let data: BTreeMap<String, String> = [
            ("case_id", "MC-11"),
            ("victim_name", "Jane Roe"),
            ("victim_age", "34"),
            ("victim_gender", "Female"),
            ("weapon_used", "Kitchen knife"),
            ("crime_scene_description", "No signs of forced entry, signs of struggle"),
            ("evidence_found", "fingerprints, CCTV footage"),
            ("suspects", "ex-partner, neighbour"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let out = murder_case_analysis(&data);
        assert!(out.contains("**Case ID:** MC-11"));
        assert!(out.contains("Jane Roe, a 34-year-old female"));
        assert!(out.contains("The use of a knife indicates"));
        assert!(out.contains("someone known to the victim"));
        assert!(out.contains("particularly ex-partner,"));
        assert!(out.contains("particularly fingerprints."));
    }

    #[test]
    fn test_case_analysis_empty_data() {
        let out = murder_case_analysis(&BTreeMap::new());
        assert!(out.starts_with("# MURDER CASE ANALYSIS"));
        assert!(out.contains("the death of the victim"));
    }
}
