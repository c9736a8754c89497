use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quote_core::{catalog, LeadId, PricingPolicy};
use quote_pricing::{IdGen, SimulationDraft, TeamRates};
use rust_decimal::Decimal;

fn build_draft(n_variable: usize) -> SimulationDraft {
    let mut ids = IdGen::seeded(42);
    let mut draft = SimulationDraft::seed(
        LeadId::new("lead-bench"),
        &catalog::default_office_costs(),
        PricingPolicy::default(),
        &mut ids,
    );
    draft.set_duration_months(6);
    for i in 0..n_variable {
        let id = draft.add_variable_item(&mut ids);
        draft.update_variable_item(
            &id,
            quote_pricing::VariableField::BaseValue(Decimal::new(100 + i as i64, 0)),
        );
    }
    for factor in ["complex-topography", "complex-short-deadline"] {
        draft.toggle_complexity(factor);
        draft.set_complexity_percentage(factor, Decimal::new(75, 1));
    }
    draft
}

fn bench_waterfall(c: &mut Criterion) {
    let rates = TeamRates::from_configs(&catalog::default_team_members());
    let draft = build_draft(50);
    c.bench_function("waterfall default template + 50 variable", |b| {
        b.iter(|| black_box(draft.totals(black_box(&rates))))
    });
}

criterion_group!(benches, bench_waterfall);
criterion_main!(benches);
