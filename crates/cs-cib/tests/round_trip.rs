//! ---
//! cs_section: "02-cib-model"
//! cs_subsection: "tests"
//! cs_type: "source"
//! cs_scope: "test"
//! cs_description: "Statement builder output fed back through the CIB parser."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
use std::collections::BTreeMap;

use cs_cib::{parse_primitives, AttributeMap, ConfigurationUpdate, Primitive};

/// Split one statement line the way a POSIX shell tokenizer does: whitespace
/// separates words, double quotes group, backslash escapes the next character.
fn tokenize(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(chars.next().expect("dangling escape"));
                in_word = true;
            }
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    assert!(!quoted, "unterminated quote in `{line}`");
    if in_word {
        words.push(current);
    }
    words
}

/// Read `key=value` words until the next clause keyword.
fn take_pairs(words: &[String], cursor: &mut usize) -> AttributeMap {
    let mut pairs = AttributeMap::new();
    while let Some(word) = words.get(*cursor) {
        let Some((key, value)) = word.split_once('=') else {
            break;
        };
        pairs.insert(key.to_owned(), value.to_owned());
        *cursor += 1;
    }
    pairs
}

/// Build the CIB `<resources>` fragment the cluster would hold after loading
/// the rendered configuration text.
fn cib_from_text(text: &str) -> String {
    let mut primitives: BTreeMap<String, String> = BTreeMap::new();
    let mut wrappers: Vec<(String, String, AttributeMap)> = Vec::new();

    for line in text.lines() {
        let words = tokenize(line);
        match words[0].as_str() {
            "primitive" => {
                let name = words[1].clone();
                let agent: cs_cib::ResourceAgent = words[2].parse().expect("agent parses");
                let mut xml = format!(
                    r#"<primitive id="{}" class="{}" type="{}""#,
                    escape(&name),
                    escape(&agent.class),
                    escape(&agent.agent_type)
                );
                if let Some(provider) = &agent.provider {
                    xml.push_str(&format!(r#" provider="{}""#, escape(provider)));
                }
                xml.push('>');
                let mut ops = String::new();
                let mut cursor = 3;
                while let Some(keyword) = words.get(cursor) {
                    cursor += 1;
                    match keyword.as_str() {
                        "op" => {
                            let op = words[cursor].clone();
                            cursor += 1;
                            ops.push_str(&format!(r#"<op id="{name}-{op}" name="{}""#, escape(&op)));
                            for (k, v) in take_pairs(&words, &mut cursor) {
                                ops.push_str(&format!(r#" {}="{}""#, k, escape(&v)));
                            }
                            ops.push_str("/>");
                        }
                        "params" => xml.push_str(&nvpair_set(
                            "instance_attributes",
                            &name,
                            &take_pairs(&words, &mut cursor),
                        )),
                        "meta" => xml.push_str(&nvpair_set(
                            "meta_attributes",
                            &name,
                            &take_pairs(&words, &mut cursor),
                        )),
                        other => panic!("unexpected keyword `{other}` in `{line}`"),
                    }
                }
                if !ops.is_empty() {
                    xml.push_str(&format!("<operations>{ops}</operations>"));
                }
                xml.push_str("</primitive>");
                primitives.insert(name, xml);
            }
            "ms" => {
                let mut cursor = 3;
                let meta = match words.get(cursor).map(String::as_str) {
                    Some("meta") => {
                        cursor += 1;
                        take_pairs(&words, &mut cursor)
                    }
                    _ => AttributeMap::new(),
                };
                assert_eq!(cursor, words.len(), "trailing words in `{line}`");
                wrappers.push((words[1].clone(), words[2].clone(), meta));
            }
            other => panic!("statement must start with a header, got `{other}`"),
        }
    }

    let mut resources = String::new();
    for (wrapper, primitive, meta) in wrappers {
        let inner = primitives
            .remove(&primitive)
            .expect("wrapper must reference a defined primitive");
        resources.push_str(&format!(r#"<master id="{wrapper}">"#));
        if !meta.is_empty() {
            resources.push_str(&nvpair_set("meta_attributes", &wrapper, &meta));
        }
        resources.push_str(&inner);
        resources.push_str("</master>");
    }
    for xml in primitives.into_values() {
        resources.push_str(&xml);
    }
    format!("<cib><configuration><resources>{resources}</resources></configuration></cib>")
}

fn nvpair_set(tag: &str, owner: &str, attributes: &AttributeMap) -> String {
    let mut xml = format!(r#"<{tag} id="{owner}-{tag}">"#);
    for (k, v) in attributes {
        xml.push_str(&format!(
            r#"<nvpair id="{owner}-{tag}-{k}" name="{}" value="{}"/>"#,
            escape(k),
            escape(v)
        ));
    }
    xml.push_str(&format!("</{tag}>"));
    xml
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn round_trip(primitive: &Primitive) -> Primitive {
    let update = ConfigurationUpdate::for_primitive(primitive);
    let mut parsed = parse_primitives(&cib_from_text(&update.render())).expect("document parses");
    assert_eq!(parsed.len(), 1);
    parsed.remove(0)
}

#[test]
fn plain_primitive_survives_round_trip() {
    let primitive = Primitive::new("web1", "ocf:heartbeat:IPaddr2".parse().unwrap())
        .with_parameter("ip", "10.0.0.5")
        .with_parameter("cidr_netmask", "24")
        .with_operation("monitor", [("interval", "10s"), ("timeout", "20s")])
        .with_operation("start", [("timeout", "60s")])
        .with_metadata("resource-stickiness", "100");
    assert_eq!(round_trip(&primitive), primitive);
}

#[test]
fn promotable_primitive_survives_round_trip() {
    let mut promotion = AttributeMap::new();
    promotion.insert("target-role".into(), "Started".into());
    promotion.insert("notify".into(), "true".into());
    let primitive = Primitive::new("db", "ocf:pacemaker:Stateful".parse().unwrap())
        .with_operation("monitor", [("interval", "15s"), ("role", "Master")])
        .with_metadata("migration-threshold", "3")
        .promoted(promotion);
    let parsed = round_trip(&primitive);
    assert_eq!(parsed, primitive);
    assert_eq!(parsed.promotion_metadata.len(), 2);
}

#[test]
fn providerless_primitive_survives_round_trip() {
    let primitive = Primitive::new("mail", "lsb:postfix".parse().unwrap());
    assert_eq!(round_trip(&primitive), primitive);
}

#[test]
fn quoted_values_survive_round_trip_through_the_model() {
    let primitive = Primitive::new("p", "ocf:heartbeat:Dummy".parse().unwrap())
        .with_parameter("options", "-o a & b");
    assert_eq!(round_trip(&primitive), primitive);
}

#[test]
fn primitive_serializes_to_json_with_agent_string() {
    let primitive = Primitive::new("web1", "ocf:heartbeat:IPaddr2".parse().unwrap());
    let json = serde_json::to_value(&primitive).unwrap();
    assert_eq!(json["agent"], "ocf:heartbeat:IPaddr2");
    let back: Primitive = serde_json::from_value(json).unwrap();
    assert_eq!(back, primitive);
}

#[test]
fn backslashes_and_quotes_survive_the_text_form() {
    let primitive = Primitive::new("p", "ocf:heartbeat:Dummy".parse().unwrap())
        .with_parameter("path", r"C:\tmp")
        .with_parameter("pattern", r"^a\d+$")
        .with_parameter("spaced", r"C:\my tmp")
        .with_parameter("quoted", r#"say "hi" it's"#)
        .with_parameter("empty", "")
        .with_operation("monitor", [("OCF_CHECK_LEVEL", r"\10")]);
    assert_eq!(round_trip(&primitive), primitive);
}

#[test]
fn tokenizer_keeps_bare_and_quoted_words_apart() {
    assert_eq!(
        tokenize(r#"params a=1 b="x \"y\"" c="""#),
        ["params", "a=1", r#"b=x "y""#, "c="]
    );
}
