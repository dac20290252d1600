use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};

use crate::types::{ADDRESS_NOT_FOUND, AppointmentRecord, DATE_NOT_FOUND};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Missing required field '{field}' in appointment block {block}")]
    MissingField { block: usize, field: &'static str },
}

/// Records of one result page, plus the blocks that could not be turned into records.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageExtraction {
    pub records: Vec<AppointmentRecord>,
    pub errors: Vec<ParseError>,
}

const ADDRESS_LABEL: &str = "כתובת";
const OFFICE_DATE_ALT: &str = "במרפאה:";
const PHONE_DATE_ALT: &str = "מרחוק:";

static APPOINTMENT_BLOCK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.docResualtWrap.col-md-12").expect("invalid selector: appointment block")
});
static TITLE_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.docResualtTitleList a.docPropTitle").expect("invalid selector: title link")
});
static AREA_ITEM: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.sectionDoc.docPropSubTitle li").expect("invalid selector: area item")
});
static DIV: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div").expect("invalid selector: div"));
static DATE_ANSWER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.contactDetailsAns.flx-row").expect("invalid selector: date answer")
});

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First element inside `block` matching `target` that comes after the first node
/// accepted by `is_anchor`, in document order.
fn find_next_after<'a>(
    block: ElementRef<'a>,
    is_anchor: impl Fn(&Node) -> bool,
    target: &Selector,
) -> Option<ElementRef<'a>> {
    block
        .descendants()
        .skip_while(|node| !is_anchor(node.value()))
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|element| target.matches(element))
}

fn is_address_label(node: &Node) -> bool {
    node.as_text()
        .is_some_and(|text| text.trim() == ADDRESS_LABEL)
}

fn is_icon(node: &Node, alt: &str) -> bool {
    node.as_element()
        .is_some_and(|element| element.name() == "img" && element.attr("alt") == Some(alt))
}

fn date_after_icon(block: ElementRef, alt: &str) -> String {
    find_next_after(block, |node| is_icon(node, alt), &DATE_ANSWER)
        .map(|div| elem_text(div).trim().to_string())
        .unwrap_or_else(|| DATE_NOT_FOUND.to_string())
}

fn appointment_link(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}{}", crate::BASE_URL, href.trim_start_matches('/'))
    }
}

pub fn extract(html: &str) -> PageExtraction {
    let document = Html::parse_document(html);
    let mut extraction = PageExtraction::default();

    for (index, block) in document.select(&APPOINTMENT_BLOCK).enumerate() {
        match parse_appointment_block(block, index + 1) {
            Ok(record) => extraction.records.push(record),
            Err(e) => {
                log::debug!("Skipping appointment block: {}", e);
                extraction.errors.push(e);
            }
        }
    }

    log::debug!(
        "Extracted {} record(s), skipped {}",
        extraction.records.len(),
        extraction.errors.len()
    );

    extraction
}

fn parse_appointment_block(
    block: ElementRef,
    position: usize,
) -> Result<AppointmentRecord, ParseError> {
    let missing = |field| ParseError::MissingField {
        block: position,
        field,
    };

    let title_link = block
        .select(&TITLE_LINK)
        .next()
        .ok_or_else(|| missing("doctor"))?;
    let doctor = normalize_whitespace(&elem_text(title_link));
    if doctor.is_empty() {
        return Err(missing("doctor"));
    }

    let area = block
        .select(&AREA_ITEM)
        .next()
        .map(|li| normalize_whitespace(&elem_text(li)))
        .filter(|area| !area.is_empty())
        .ok_or_else(|| missing("area"))?;

    let href = title_link
        .value()
        .attr("href")
        .ok_or_else(|| missing("appointment link"))?;

    let address = find_next_after(block, is_address_label, &DIV)
        .map(|div| normalize_whitespace(&elem_text(div)))
        .unwrap_or_else(|| ADDRESS_NOT_FOUND.to_string());

    Ok(AppointmentRecord {
        doctor,
        area,
        appointment_link: appointment_link(href),
        address,
        office_appointment_date: date_after_icon(block, OFFICE_DATE_ALT),
        phone_appointment_date: date_after_icon(block, PHONE_DATE_ALT),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn block(inner: &str) -> String {
        format!(r#"<div class="docResualtWrap col-md-12">{inner}</div>"#)
    }

    fn title(name: &str, href: &str) -> String {
        format!(
            r#"<div class="docResualtTitleList"><a class="docPropTitle" href="{href}">{name}</a></div>"#
        )
    }

    fn area(name: &str) -> String {
        format!(r#"<div class="sectionDoc docPropSubTitle"><ul><li>{name}</li></ul></div>"#)
    }

    #[test]
    fn test_extract_results_page_from_fixture() {
        let html = fs::read_to_string("fixtures/results_page.html")
            .expect("Failed to read sample HTML file");

        let extraction = extract(&html);

        assert!(extraction.errors.is_empty(), "{:?}", extraction.errors);
        assert_eq!(extraction.records.len(), 3);

        let doctors: Vec<&str> = extraction
            .records
            .iter()
            .map(|r| r.doctor.as_str())
            .collect();
        assert_eq!(doctors, ["ד\"ר כהן דוד", "ד\"ר לוי שרה", "ד\"ר מזרחי יוסי"]);

        let first = &extraction.records[0];
        assert_eq!(first.area, "רפואת עור ומין");
        assert_eq!(
            first.appointment_link,
            "https://serguide.maccabi4u.co.il/heb/doctors/doctorssearchresults/doctorsinfopage/?ItemKeyIndex=A1001"
        );
        assert_eq!(first.address, "הרצל 10, תל אביב");
        assert_eq!(first.office_appointment_date, "12/11/2026");
        assert_eq!(first.phone_appointment_date, "05/11/2026");
    }

    #[test]
    fn test_extract_fixture_placeholders() {
        let html = fs::read_to_string("fixtures/results_page.html")
            .expect("Failed to read sample HTML file");

        let records = extract(&html).records;

        let levi = &records[1];
        assert_eq!(levi.address, ADDRESS_NOT_FOUND);
        assert_eq!(levi.office_appointment_date, "20/11/2026");
        assert_eq!(levi.phone_appointment_date, DATE_NOT_FOUND);
        assert_eq!(
            levi.appointment_link,
            "https://serguide.maccabi4u.co.il/heb/doctors/doctorssearchresults/doctorsinfopage/?ItemKeyIndex=B2002",
            "Leading slash should not double up with the base URL"
        );

        let mizrahi = &records[2];
        assert_eq!(mizrahi.address, "ויצמן 5, כפר סבא");
        assert_eq!(mizrahi.office_appointment_date, "None");
        assert_eq!(mizrahi.phone_appointment_date, "None");
    }

    #[test]
    fn test_extract_keeps_document_order_and_duplicates() {
        let html = [
            block(&(title("Dr. A", "a") + &area("Cardiology"))),
            block(&(title("Dr. B", "b") + &area("Neurology"))),
            block(&(title("Dr. A", "a") + &area("Cardiology"))),
            block(&(title("Dr. C", "c") + &area("Pediatrics"))),
        ]
        .concat();

        let records = extract(&html).records;

        let doctors: Vec<&str> = records.iter().map(|r| r.doctor.as_str()).collect();
        assert_eq!(doctors, ["Dr. A", "Dr. B", "Dr. A", "Dr. C"]);
        assert_eq!(records[0], records[2]);
    }

    #[test]
    fn test_extract_requires_both_block_classes() {
        let html = format!(
            r#"<div class="docResualtWrap">{}</div>{}"#,
            title("Dr. Hidden", "h") + &area("Cardiology"),
            block(&(title("Dr. Shown", "s") + &area("Cardiology")))
        );

        let records = extract(&html).records;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].doctor, "Dr. Shown");
    }

    #[test]
    fn test_extract_missing_title_link_is_reported() {
        let html = [
            block(&(title("Dr. A", "a") + &area("Cardiology"))),
            block(&area("Neurology")),
            block(&(title("Dr. C", "c") + &area("Pediatrics"))),
        ]
        .concat();

        let extraction = extract(&html);

        assert_eq!(extraction.records.len(), 2);
        assert!(extraction.records.iter().all(|r| !r.doctor.is_empty()));
        assert_eq!(
            extraction.errors,
            vec![ParseError::MissingField {
                block: 2,
                field: "doctor"
            }]
        );
    }

    #[test]
    fn test_extract_missing_area_is_reported() {
        let html = block(&title("Dr. A", "a"));

        let extraction = extract(&html);

        assert!(extraction.records.is_empty());
        assert_eq!(
            extraction.errors,
            vec![ParseError::MissingField {
                block: 1,
                field: "area"
            }]
        );
    }

    #[test]
    fn test_extract_title_link_without_href_is_reported() {
        let html = block(
            &(r#"<div class="docResualtTitleList"><a class="docPropTitle">Dr. A</a></div>"#
                .to_string()
                + &area("Cardiology")),
        );

        let extraction = extract(&html);

        assert!(extraction.records.is_empty());
        assert_eq!(
            extraction.errors,
            vec![ParseError::MissingField {
                block: 1,
                field: "appointment link"
            }]
        );
    }

    #[test]
    fn test_extract_absolute_href_is_kept() {
        let html = block(&(title("Dr. A", "https://example.org/doc/1") + &area("Cardiology")));

        let records = extract(&html).records;

        assert_eq!(records[0].appointment_link, "https://example.org/doc/1");
    }

    #[test]
    fn test_extract_date_lookup_stays_inside_block() {
        let first = title("Dr. A", "a")
            + &area("Cardiology")
            + r#"<img alt="במרפאה:"><span>תור פנוי במרפאה</span>"#;
        let second = title("Dr. B", "b")
            + &area("Neurology")
            + r#"<img alt="במרפאה:"><div class="contactDetailsAns flx-row">01/12/2026</div>"#;
        let html = block(&first) + &block(&second);

        let records = extract(&html).records;

        assert_eq!(records[0].office_appointment_date, "None");
        assert_eq!(records[1].office_appointment_date, "01/12/2026");
    }

    #[test]
    fn test_extract_date_ignores_answers_before_icon() {
        let inner = title("Dr. A", "a")
            + &area("Cardiology")
            + r#"<div class="contactDetailsAns flx-row">too early</div>"#
            + r#"<img alt="מרחוק:"><div class="contactDetailsAns flx-row">03/12/2026</div>"#;

        let records = extract(&block(&inner)).records;

        assert_eq!(records[0].phone_appointment_date, "03/12/2026");
        assert_eq!(records[0].office_appointment_date, "None");
    }

    #[test]
    fn test_extract_date_keeps_inner_line_breaks() {
        let inner = title("Dr. A", "a")
            + &area("Cardiology")
            + "<img alt=\"במרפאה:\"><div class=\"contactDetailsAns flx-row\">\n  12/11/2026\n   09:00  </div>";

        let records = extract(&block(&inner)).records;

        assert_eq!(records[0].office_appointment_date, "12/11/2026\n   09:00");
    }

    #[test]
    fn test_extract_page_without_blocks() {
        let html = "<html><body><p>לא נמצאו תוצאות</p></body></html>";

        let extraction = extract(html);

        assert!(extraction.records.is_empty());
        assert!(extraction.errors.is_empty());
    }
}
