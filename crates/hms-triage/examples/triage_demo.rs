//! 急诊分诊台演示程序
//!
//! 展示分诊登记、优先级排序、生命体征恶化告警、消除告警以及入院分配床位

use hms_core::fixtures::{reference_beds, reference_er_queue};
use hms_core::{TriagePriority, TriageResult, Vitals};
use hms_triage::{
    BedPool, DeskConfig, QueueStore, ScriptedDeterioration, TracingAudioSink, TriageDesk,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    let desk = TriageDesk::with_source(
        QueueStore::from_items(reference_er_queue()),
        BedPool::new(reference_beds()),
        Arc::new(TracingAudioSink),
        DeskConfig::default(),
        Box::new(ScriptedDeterioration::new([Some(1)])),
    );

    println!("🚑 急诊分诊台演示\n");

    // 1. 新患者分诊登记
    let item = desk
        .intake(
            4,
            "Sudden slurred speech and facial droop.",
            Vitals {
                heart_rate: Some(98),
                blood_pressure: Some("170/100".to_string()),
                ..Default::default()
            },
            TriageResult::new(TriagePriority::Critical, "Possible stroke, time critical."),
        )
        .await;
    println!("✅ 登记患者 {} (分诊区 {})", item.id, item.bay_number);

    print_queue(&desk).await;

    // 2. 模拟生命体征恶化
    if let Some(id) = desk.simulator().tick().await {
        desk.notifier().sync().await;
        println!("\n🚨 患者 {} 生命体征恶化，警报器已启动", id);

        desk.silence_alarm(id).await;
        println!("🔕 已消除患者 {} 的告警", id);
    }

    // 3. 按队列顺序依次入院
    println!();
    for queued in desk.queue().snapshot().await {
        match desk.admit(queued.id).await {
            Some(admission) => println!(
                "🛏️  患者 {} 入住 {} ({})",
                admission.patient_identity, admission.bed.id, admission.bed.ward
            ),
            None => println!("⚠️  没有空闲床位，患者 {} 继续候诊", queued.id),
        }
    }

    // 4. 病区床位统计
    println!("\n📊 病区床位:");
    for ward in desk.beds().ward_census().await {
        println!(
            "   {}: 空闲 {} / 占用 {} / 清洁 {}",
            ward.ward, ward.available, ward.occupied, ward.cleaning
        );
    }

    let overview = desk.overview().await;
    println!("\n   候诊人数: {}", overview.queue_length);
    println!("   空闲床位: {}", overview.available_beds);

    desk.stop().await;
    Ok(())
}

async fn print_queue(desk: &TriageDesk) {
    println!("\n📋 候诊队列:");
    for (position, item) in desk.queue().snapshot().await.iter().enumerate() {
        println!(
            "   {}. 分诊区 {} [{:?}] {}",
            position + 1,
            item.bay_number,
            item.priority(),
            item.complaint
        );
    }
}
