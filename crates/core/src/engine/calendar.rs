use crate::domain::event::{CommercialEvent, DateRule, ImpactTier};
use crate::error::EngineError;
use anyhow::Context;
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCalendar {
    events: Vec<CommercialEvent>,
}

impl EventCalendar {
    pub fn new(events: Vec<CommercialEvent>) -> Result<Self, EngineError> {
        let mut seen = HashSet::new();
        for event in &events {
            event.validate()?;
            if !seen.insert(event.name.as_str()) {
                return Err(EngineError::DuplicateEvent(event.name.clone()));
            }
        }
        Ok(Self { events })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads `{ "events": [...] }` and validates every entry.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read calendar {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("invalid calendar {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        let raw: EventCalendar =
            serde_json::from_str(text).context("calendar is not valid JSON")?;
        Ok(Self::new(raw.events)?)
    }

    pub fn events(&self) -> &[CommercialEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Every event with its next occurrence on or after `from`, soonest first.
    pub fn upcoming(&self, from: NaiveDate) -> Vec<(&CommercialEvent, NaiveDate)> {
        let mut out: Vec<_> = self
            .events
            .iter()
            .filter_map(|e| e.resolve_from(from, 0).map(|d| (e, d)))
            .collect();
        out.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.name.cmp(&b.0.name)));
        out
    }

    /// Built-in Brazilian retail calendar.
    pub fn brazil_retail() -> Self {
        let events = vec![
            event("Ano Novo", 1, 1, ImpactTier::Low, "do")
                .long_holiday()
                .reasons(&["Início de ano - consumidores com orçamento apertado"])
                .tips(&["Aproveite para organizar o estoque para o ano"]),
            event("Carnaval", 3, 4, ImpactTier::Low, "do")
                .rule(DateRule::Easter { offset_days: -47 })
                .long_holiday()
                .reasons(&["Feriado prolongado - muitas pessoas viajam"])
                .tips(&["Evite eventos presenciais durante o feriado"]),
            event("Dia do Consumidor", 3, 15, ImpactTier::High, "do")
                .reasons(&[
                    "Data criada para promoções - consumidores esperam descontos",
                    "Boa oportunidade para atrair novos clientes",
                ])
                .tips(&[
                    "Crie combos com desconto progressivo",
                    "Ofereça brindes para compras acima de um valor",
                    "Divulgue nas redes com a hashtag da data",
                ]),
            event("Páscoa", 4, 20, ImpactTier::High, "da")
                .rule(DateRule::Easter { offset_days: 0 })
                .reasons(&[
                    "Época de presentes e encontros em família",
                    "Procura por itens temáticos aumenta",
                ])
                .tips(&[
                    "Monte kits de presente com embalagem temática",
                    "Destaque produtos infantis e de decoração",
                ]),
            event("Tiradentes", 4, 21, ImpactTier::Low, "de"),
            event("Dia do Trabalho", 5, 1, ImpactTier::Low, "do"),
            event("Dia das Mães", 5, 11, ImpactTier::VeryHigh, "do")
                .rule(DateRule::NthWeekday {
                    weekday: Weekday::Sun,
                    nth: 2,
                    offset_days: 0,
                })
                .reasons(&[
                    "Segunda data mais forte do varejo",
                    "Filhos buscam presentes com antecedência",
                ])
                .tips(&[
                    "Destaque produtos que mães adoram: bolsas, acessórios e roupas",
                    "Ofereça embalagem para presente",
                    "Crie um cartão personalizado para acompanhar a compra",
                ]),
            event("Dia dos Namorados", 6, 12, ImpactTier::High, "do")
                .reasons(&[
                    "Casais procuram presentes criativos",
                    "Produtos únicos e usados têm apelo especial",
                ])
                .tips(&[
                    "Monte kits para casais",
                    "Use decoração temática nas fotos",
                ]),
            event("Festa Junina", 6, 24, ImpactTier::Low, "da"),
            event("Dia dos Pais", 8, 10, ImpactTier::High, "do")
                .rule(DateRule::NthWeekday {
                    weekday: Weekday::Sun,
                    nth: 2,
                    offset_days: 0,
                })
                .reasons(&[
                    "Data forte para moda masculina e acessórios",
                    "Compradores buscam presentes práticos",
                ])
                .tips(&[
                    "Separe uma seção de moda masculina",
                    "Sugira presentes por faixa de preço",
                ]),
            event("Independência do Brasil", 9, 7, ImpactTier::Low, "da")
                .long_holiday()
                .reasons(&["Feriado nacional - movimento reduzido"]),
            event("Dia do Cliente", 9, 15, ImpactTier::High, "do")
                .reasons(&[
                    "Clientes esperam mimos e condições especiais",
                    "Ótimo momento para fidelizar compradores",
                ])
                .tips(&[
                    "Envie cupons para quem já comprou",
                    "Agradeça publicamente seus clientes nas redes",
                ]),
            event("Dia das Crianças", 10, 12, ImpactTier::VeryHigh, "do")
                .reasons(&[
                    "Pais e parentes compram brinquedos e roupas infantis",
                    "Uma das datas mais movimentadas do segundo semestre",
                ])
                .tips(&[
                    "Destaque brinquedos e roupas infantis",
                    "Organize os produtos por faixa etária",
                    "Faça fotos com cenário lúdico",
                ]),
            event("Black Friday", 11, 28, ImpactTier::VeryHigh, "da")
                .rule(DateRule::NthWeekday {
                    weekday: Weekday::Thu,
                    nth: 4,
                    offset_days: 1,
                })
                .reasons(&[
                    "Maior data de promoções do ano",
                    "Consumidores planejam compras com antecedência",
                ])
                .tips(&[
                    "Antecipe as ofertas para fugir da concorrência",
                    "Mostre o preço original ao lado do desconto",
                    "Garanta estoque dos itens mais procurados",
                ]),
            event("Natal", 12, 25, ImpactTier::VeryHigh, "do")
                .long_holiday()
                .reasons(&[
                    "Data mais forte do varejo",
                    "13º salário aumenta o poder de compra",
                ])
                .tips(&[
                    "Prepare kits de presente com embalagem natalina",
                    "Amplie o horário de atendimento",
                    "Ofereça opções de presente por faixa de preço",
                ]),
        ];

        Self {
            events: events.into_iter().map(EventBuilder::build).collect(),
        }
    }
}

struct EventBuilder(CommercialEvent);

fn event(name: &str, month: u32, day: u32, tier: ImpactTier, preposition: &str) -> EventBuilder {
    EventBuilder(CommercialEvent {
        name: name.to_string(),
        month,
        day,
        impact_tier: tier,
        reasons: Vec::new(),
        tips: Vec::new(),
        rule: None,
        long_holiday: false,
        preposition: preposition.to_string(),
    })
}

impl EventBuilder {
    fn rule(mut self, rule: DateRule) -> Self {
        self.0.rule = Some(rule);
        self
    }

    fn long_holiday(mut self) -> Self {
        self.0.long_holiday = true;
        self
    }

    fn reasons(mut self, reasons: &[&str]) -> Self {
        self.0.reasons = reasons.iter().map(|s| s.to_string()).collect();
        self
    }

    fn tips(mut self, tips: &[&str]) -> Self {
        self.0.tips = tips.iter().map(|s| s.to_string()).collect();
        self
    }

    fn build(self) -> CommercialEvent {
        self.0
    }
}
