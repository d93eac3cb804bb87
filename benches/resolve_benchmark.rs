//! Benchmark for property resolution and editing
//!
//! Target: set_property on a 200-group project should complete in <1ms

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use project_props_core::condition::cache::{clear_cache, get_or_parse};
use project_props_core::condition::parser::parse;
use project_props_core::{
    effective_value, evaluate_properties, find_existing, set_property, GlobalProperties,
    ProjectDocument,
};

/// Create a realistic project with alternating conditional groups
fn create_test_project() -> String {
    let mut xml = String::from("<Project ToolsVersion=\"15.0\">\n");

    for i in 0..200 {
        if i % 3 == 0 {
            xml.push_str("  <PropertyGroup>\n");
        } else {
            let configuration = if i % 2 == 0 { "Debug" } else { "Release" };
            xml.push_str(&format!(
                "  <PropertyGroup Condition=\" '$(Configuration)|$(Platform)' == '{}|AnyCPU' \">\n",
                configuration
            ));
        }
        xml.push_str(&format!("    <OutputPath>bin\\{}\\</OutputPath>\n", i));
        xml.push_str(&format!("    <Setting{}>value{}</Setting{}>\n", i % 10, i, i % 10));
        xml.push_str("  </PropertyGroup>\n");
    }

    xml.push_str("  <ItemGroup>\n    <Compile Include=\"Program.cs\" />\n  </ItemGroup>\n");
    xml.push_str("</Project>\n");
    xml
}

fn benchmark_load(c: &mut Criterion) {
    let xml = create_test_project();

    c.bench_function("load_project", |b| {
        b.iter(|| black_box(ProjectDocument::parse(&xml)))
    });

    let doc = ProjectDocument::parse(&xml).unwrap();
    c.bench_function("write_project", |b| b.iter(|| black_box(doc.to_xml())));
}

fn benchmark_resolution(c: &mut Criterion) {
    let doc = ProjectDocument::parse(&create_test_project()).unwrap();

    c.bench_function("find_existing", |b| {
        b.iter(|| black_box(find_existing(&doc, &["OutputPath", "Setting3"])))
    });

    c.bench_function("set_property", |b| {
        b.iter_batched(
            || doc.clone(),
            |mut doc| {
                set_property(&mut doc, "OutputPath", "out\\").unwrap();
                doc
            },
            criterion::BatchSize::SmallInput,
        )
    });

    let globals = GlobalProperties::new()
        .with_property("Configuration", "Release")
        .with_property("Platform", "AnyCPU");

    c.bench_function("effective_value", |b| {
        b.iter(|| black_box(effective_value(&doc, "OutputPath", &globals)))
    });

    c.bench_function("evaluate_properties", |b| {
        b.iter(|| black_box(evaluate_properties(&doc, &globals)))
    });
}

fn benchmark_condition_parsing(c: &mut Criterion) {
    let conditions = vec![
        "'$(Configuration)' == 'Debug'",
        "'$(Configuration)|$(Platform)' == 'Release|AnyCPU'",
        "!Exists('packages.config') and '$(Platform)' != 'x64'",
        "'$(TargetFrameworkVersion)' >= '4.5' or HasTrailingSlash('$(OutDir)')",
        "('$(A)' == '1' or '$(B)' == '2') and !('$(C)' == '3')",
    ];

    c.bench_function("condition_parsing_cold", |b| {
        b.iter(|| {
            for cond in &conditions {
                let _ = black_box(parse(cond));
            }
        })
    });

    c.bench_function("condition_parsing_cached", |b| {
        clear_cache();
        for cond in &conditions {
            let _ = get_or_parse(cond);
        }

        b.iter(|| {
            for cond in &conditions {
                let _ = black_box(get_or_parse(cond));
            }
        })
    });
}

criterion_group!(benches, benchmark_load, benchmark_resolution, benchmark_condition_parsing);
criterion_main!(benches);
