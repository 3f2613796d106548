//! Static catalogue of study-resource links, keyed by exam board and
//! subject. The platform validates the choice parameters before the handler
//! ever runs, so lookups here can stay a plain table scan.

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum Board {
    #[name = "Cambridge (CAIE)"]
    Caie,
    #[name = "Edexcel"]
    Edexcel,
    #[name = "AQA"]
    Aqa,
    #[name = "IB"]
    Ib,
}

impl Board {
    pub fn label(self) -> &'static str {
        match self {
            Board::Caie => "Cambridge (CAIE)",
            Board::Edexcel => "Edexcel",
            Board::Aqa => "AQA",
            Board::Ib => "IB",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum Subject {
    #[name = "Physics"]
    Physics,
    #[name = "Chemistry"]
    Chemistry,
    #[name = "Biology"]
    Biology,
    #[name = "Mathematics"]
    Mathematics,
    #[name = "Computer Science"]
    ComputerScience,
    #[name = "Economics"]
    Economics,
}

impl Subject {
    pub fn label(self) -> &'static str {
        match self {
            Subject::Physics => "Physics",
            Subject::Chemistry => "Chemistry",
            Subject::Biology => "Biology",
            Subject::Mathematics => "Mathematics",
            Subject::ComputerScience => "Computer Science",
            Subject::Economics => "Economics",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResourceLink {
    pub title: &'static str,
    pub url: &'static str,
}

type Entry = ((Board, Subject), &'static [ResourceLink]);

static CATALOG: &[Entry] = &[
    (
        (Board::Caie, Subject::Physics),
        &[
            ResourceLink {
                title: "Past papers (9702)",
                url: "https://pastpapers.co/cie/?dir=A-Level/Physics-9702",
            },
            ResourceLink {
                title: "Save My Exams revision notes",
                url: "https://www.savemyexams.com/a-level/physics/cie/",
            },
        ],
    ),
    (
        (Board::Caie, Subject::Chemistry),
        &[
            ResourceLink {
                title: "Past papers (9701)",
                url: "https://pastpapers.co/cie/?dir=A-Level/Chemistry-9701",
            },
            ResourceLink {
                title: "Chemguide topic explanations",
                url: "https://www.chemguide.co.uk/",
            },
        ],
    ),
    (
        (Board::Caie, Subject::Mathematics),
        &[ResourceLink {
            title: "Past papers (9709)",
            url: "https://pastpapers.co/cie/?dir=A-Level/Mathematics-9709",
        }],
    ),
    (
        (Board::Caie, Subject::ComputerScience),
        &[ResourceLink {
            title: "Past papers (9618)",
            url: "https://pastpapers.co/cie/?dir=A-Level/Computer-Science-9618",
        }],
    ),
    (
        (Board::Edexcel, Subject::Physics),
        &[ResourceLink {
            title: "Physics & Maths Tutor — Edexcel Physics",
            url: "https://www.physicsandmathstutor.com/physics-revision/a-level-edexcel/",
        }],
    ),
    (
        (Board::Edexcel, Subject::Mathematics),
        &[ResourceLink {
            title: "Physics & Maths Tutor — Edexcel Maths",
            url: "https://www.physicsandmathstutor.com/maths-revision/a-level-edexcel/",
        }],
    ),
    (
        (Board::Edexcel, Subject::Economics),
        &[ResourceLink {
            title: "Tutor2u Economics",
            url: "https://www.tutor2u.net/economics",
        }],
    ),
    (
        (Board::Aqa, Subject::Biology),
        &[ResourceLink {
            title: "Physics & Maths Tutor — AQA Biology",
            url: "https://www.physicsandmathstutor.com/biology-revision/a-level-aqa/",
        }],
    ),
    (
        (Board::Aqa, Subject::Chemistry),
        &[ResourceLink {
            title: "Physics & Maths Tutor — AQA Chemistry",
            url: "https://www.physicsandmathstutor.com/chemistry-revision/a-level-aqa/",
        }],
    ),
    (
        (Board::Ib, Subject::Physics),
        &[ResourceLink {
            title: "Revision Village style notes (physics)",
            url: "https://www.physicsandmathstutor.com/physics-revision/ib/",
        }],
    ),
    (
        (Board::Ib, Subject::Mathematics),
        &[ResourceLink {
            title: "Revision Village — IB Maths",
            url: "https://www.revisionvillage.com/",
        }],
    ),
];

/// Links catalogued for the combination, empty when nothing is on file.
pub fn lookup(board: Board, subject: Subject) -> &'static [ResourceLink] {
    CATALOG
        .iter()
        .find(|((b, s), _)| *b == board && *s == subject)
        .map(|(_, links)| *links)
        .unwrap_or(&[])
}

/// One line per catalogued board/subject pair, for the overview command.
pub fn overview() -> String {
    CATALOG
        .iter()
        .map(|((board, subject), links)| {
            format!(
                "**{} — {}**: {} link{}",
                board.label(),
                subject.label(),
                links.len(),
                if links.len() == 1 { "" } else { "s" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_combination_has_links() {
        let links = lookup(Board::Caie, Subject::Physics);
        assert!(!links.is_empty());
        assert!(links.iter().all(|l| l.url.starts_with("https://")));
    }

    #[test]
    fn unknown_combination_is_empty_not_an_error() {
        assert!(lookup(Board::Ib, Subject::Economics).is_empty());
    }

    #[test]
    fn overview_mentions_every_entry() {
        let overview = overview();
        for ((board, subject), _) in CATALOG {
            assert!(overview.contains(board.label()));
            assert!(overview.contains(subject.label()));
        }
    }
}
